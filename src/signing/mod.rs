//! Request signing for the update wire protocol.
//!
//! Every request to the update service carries three headers: the application
//! key, a Unix timestamp, and an HMAC-SHA256 signature over a canonical
//! string the server rebuilds independently. The canonical string is
//!
//! ```text
//! {timestamp}.{METHOD}.{path}.{sorted-and-encoded-query-string}
//! ```
//!
//! joined with literal `.` and no escaping between fields. Paths and query
//! strings are controlled inputs (bundle identifiers and fixed routes), so
//! the unescaped join is an accepted format constraint of the protocol, not
//! something this module tries to repair.
//!
//! [`build_query_string`] produces the exact canonical query encoding the
//! server expects: RFC3986 query-safe percent-encoding with pairs sorted
//! lexicographically by key. Both halves of this module are part of the wire
//! contract; changing either breaks signature validation.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the public application key.
pub const HEADER_APP_KEY: &str = "X-App-Key";
/// Header carrying the request timestamp (Unix seconds, decimal).
pub const HEADER_TIMESTAMP: &str = "X-Timestamp";
/// Header carrying the hex-encoded request signature.
pub const HEADER_SIGNATURE: &str = "X-Signature";

/// Characters left unencoded in query components: RFC3986 unreserved.
/// Everything else, including space, is percent-encoded.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Compute the request signature.
///
/// HMAC-SHA256 keyed with `secret` over the canonical string
/// `"{timestamp}.{METHOD}.{path}.{query_string}"`, hex-encoded lowercase.
/// The method is upper-cased before joining, so `"get"` and `"GET"` sign
/// identically. Deterministic: identical inputs always produce identical
/// output, which is what lets an independent server-side implementation
/// validate it.
///
/// # Examples
///
/// ```rust
/// use airlift::signing::sign;
///
/// let sig = sign("GET", "/v1/apps/com.test/updates/check", "currentVersion=1.0.0", 1_700_000_000, "sk_test_secret");
/// assert_eq!(sig.len(), 64);
/// ```
#[must_use]
pub fn sign(method: &str, path: &str, query_string: &str, timestamp: i64, secret: &str) -> String {
    let canonical = format!("{timestamp}.{}.{path}.{query_string}", method.to_uppercase());

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Build the canonical query string for signing and for the request URL.
///
/// Pairs are emitted as `key=value` with both halves percent-encoded per
/// RFC3986 query rules, joined by `&`, sorted lexicographically by key.
/// An empty map yields the empty string.
///
/// # Examples
///
/// ```rust
/// use airlift::signing::build_query_string;
/// use std::collections::BTreeMap;
///
/// let mut params = BTreeMap::new();
/// params.insert("currentVersion".to_string(), "1.0.0".to_string());
/// assert_eq!(build_query_string(&params), "currentVersion=1.0.0");
/// ```
#[must_use]
pub fn build_query_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_ENCODE_SET),
                utf8_percent_encode(value, QUERY_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// A fully signed request, ready to be turned into headers and a URL.
///
/// Ephemeral: built immediately before a request is sent and discarded with
/// it. Holds no mutable state and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Canonical request path.
    pub path: String,
    /// Canonical (sorted, encoded) query string; empty when no parameters.
    pub query_string: String,
    /// Unix timestamp (seconds) the signature was computed at.
    pub timestamp: i64,
    /// Lowercase hex HMAC-SHA256 signature.
    pub signature: String,
}

impl SignedRequest {
    /// Sign a request at the given timestamp.
    #[must_use]
    pub fn new(
        method: &str,
        path: &str,
        params: &BTreeMap<String, String>,
        timestamp: i64,
        secret: &str,
    ) -> Self {
        let query_string = build_query_string(params);
        let signature = sign(method, path, &query_string, timestamp, secret);
        Self {
            method: method.to_uppercase(),
            path: path.to_string(),
            query_string,
            timestamp,
            signature,
        }
    }

    /// The three authentication headers for this request.
    #[must_use]
    pub fn headers(&self, app_key: &str) -> [(&'static str, String); 3] {
        [
            (HEADER_APP_KEY, app_key.to_string()),
            (HEADER_TIMESTAMP, self.timestamp.to_string()),
            (HEADER_SIGNATURE, self.signature.clone()),
        ]
    }
}
