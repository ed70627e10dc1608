//! Admin session tokens.
//!
//! A token is `base64("<username>:<issued_at_epoch_millis>")`. It is not signed:
//! validity is recomputed on every call from the encoded fields and the clock,
//! and a token cannot be revoked before it ages out.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64_STANDARD;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::server::util::secrets_match;

pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    Malformed,
    Rejected,
}

impl SessionError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Malformed => "Invalid session token",
            Self::Rejected => "Invalid or expired session",
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

pub fn issue_token(username: &str, now: DateTime<Utc>) -> String {
    B64_STANDARD.encode(format!("{}:{}", username, now.timestamp_millis()))
}

pub fn decode_token(token: &str) -> Result<SessionClaims, SessionError> {
    let bytes = B64_STANDARD
        .decode(token.trim())
        .map_err(|_| SessionError::Malformed)?;
    let text = String::from_utf8(bytes).map_err(|_| SessionError::Malformed)?;
    // 用户名可能包含冒号，时间戳总在最后一段
    let (username, millis) = text.rsplit_once(':').ok_or(SessionError::Malformed)?;
    let millis: i64 = millis.parse().map_err(|_| SessionError::Malformed)?;
    let issued_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or(SessionError::Malformed)?;
    Ok(SessionClaims {
        username: username.to_string(),
        issued_at,
    })
}

/// Accepts iff the identity matches and `now - issued_at < 24h`.
pub fn verify_token(
    token: &str,
    expected_username: &str,
    now: DateTime<Utc>,
) -> Result<SessionClaims, SessionError> {
    let claims = decode_token(token)?;
    let identity_ok = secrets_match(&claims.username, expected_username);
    let fresh = now.signed_duration_since(claims.issued_at) < Duration::hours(SESSION_TTL_HOURS);
    if identity_ok && fresh {
        Ok(claims)
    } else {
        Err(SessionError::Rejected)
    }
}
