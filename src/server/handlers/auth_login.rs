use axum::{Json, body::Bytes, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;
use crate::server::AppState;
use crate::server::session::issue_token;
use crate::server::util::secrets_match;

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

// 请求体自行解析：任何格式错误都按凭据错误处理，不回显调用方输入
pub async fn login(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<LoginResponse>, ApiError> {
    let payload: LoginPayload = serde_json::from_slice(&body).map_err(|_| {
        tracing::warn!("Admin login rejected: unreadable body");
        ApiError::admin_unauthorized("Invalid credentials")
    })?;
    let auth = &app_state.config.auth;
    // 两项都比较完，避免通过耗时区分是用户名还是密码错误
    let username_ok = secrets_match(&payload.username, &auth.admin_username);
    let password_ok = secrets_match(&payload.password, &auth.admin_password);
    if !(username_ok & password_ok) {
        tracing::warn!("Admin login rejected");
        return Err(ApiError::admin_unauthorized("Invalid credentials"));
    }

    tracing::info!("Admin login succeeded");
    Ok(Json(LoginResponse {
        success: true,
        token: issue_token(&payload.username, Utc::now()),
    }))
}
