use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::providers::ChatCompletionBody;
use crate::providers::openrouter::types::{DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use crate::server::AppState;
use crate::server::request_logging::log_upstream_failure;
use crate::server::util::{header_str, secrets_match};

pub const FRONTEND_KEY_HEADER: &str = "x-api-key";

// 采样参数不做类型校验，原样转发；仅在字段缺失时使用默认值（显式 null 也转发）
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Value,
    #[serde(default, deserialize_with = "present")]
    pub temperature: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub top_p: Option<Value>,
}

/// `Some` for any value the caller sent, `null` included; `None` only when absent.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ChatRequest {
    pub fn into_upstream(self, model: &str) -> ChatCompletionBody {
        ChatCompletionBody {
            model: model.to_string(),
            messages: self.messages,
            temperature: self
                .temperature
                .unwrap_or_else(|| Value::from(DEFAULT_TEMPERATURE)),
            top_p: self.top_p.unwrap_or_else(|| Value::from(DEFAULT_TOP_P)),
        }
    }
}

// 先校验共享密钥再解析请求体，未授权请求不会触发任何上游调用
pub async fn chat(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let provided = header_str(&headers, FRONTEND_KEY_HEADER).unwrap_or_default();
    if !secrets_match(provided, &app_state.config.auth.frontend_api_key) {
        return Err(ApiError::Unauthorized);
    }

    let request: ChatRequest = serde_json::from_slice(&body).map_err(|_| ApiError::BadRequest)?;
    let upstream_body = request.into_upstream(&app_state.config.upstream.model);

    match app_state.upstream.chat_completion(&upstream_body).await {
        Ok(raw) => Ok(([(header::CONTENT_TYPE, "application/json")], raw).into_response()),
        Err(e) => {
            log_upstream_failure("chat_completion", &e);
            Err(ApiError::Internal)
        }
    }
}
