//! Time-based HMAC signature appended to the webhook URL.
//!
//! The platform expects `timestamp` (epoch milliseconds) and `sign` query
//! parameters, where `sign` is HMAC-SHA256 over `"{timestamp}\n{secret}"`
//! keyed with the secret, base64-encoded and then percent-encoded. The remote
//! side rejects timestamps outside its validity window, so a signature is
//! computed for every request rather than cached.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Raw standard-base64 HMAC-SHA256 digest of `"{timestamp_ms}\n{secret}"`.
pub fn compute_signature(secret: &str, timestamp_ms: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac accepts keys of any length"));
    mac.update(format!("{timestamp_ms}\n{secret}").as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Signature ready for a query string: `compute_signature` percent-encoded.
pub fn sign(secret: &str, timestamp_ms: i64) -> String {
    urlencoding::encode(&compute_signature(secret, timestamp_ms)).into_owned()
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
