use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::server::AppState;
use crate::server::session::{SessionClaims, verify_token};
use crate::server::util::bearer_token;

/// Gate for every admin data route. Nothing is looked up server-side: the
/// token's own fields plus the clock decide.
pub fn ensure_admin(
    headers: &HeaderMap,
    app_state: &AppState,
    now: DateTime<Utc>,
) -> Result<SessionClaims, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Err(ApiError::admin_unauthorized("Unauthorized"));
    };
    verify_token(&token, &app_state.config.auth.admin_username, now).map_err(|e| {
        tracing::warn!(reason = %e, "Admin session rejected");
        ApiError::admin_unauthorized(e.message())
    })
}
