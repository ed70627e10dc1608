use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const COMPARE_KEY: &[u8] = b"chat-relay:secret-compare";

// HTTP helpers
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Constant-time string equality. Both sides are MACed so the comparison
/// time does not depend on where the first differing byte sits, nor on length.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let (Ok(mut provided_mac), Ok(mut expected_mac)) = (
        HmacSha256::new_from_slice(COMPARE_KEY),
        HmacSha256::new_from_slice(COMPARE_KEY),
    ) else {
        return false;
    };
    provided_mac.update(provided.as_bytes());
    expected_mac.update(expected.as_bytes());
    let expected_tag = expected_mac.finalize().into_bytes();
    provided_mac.verify_slice(&expected_tag).is_ok()
}
