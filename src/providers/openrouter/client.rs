use std::time::Duration;

use axum::body::Bytes;
use reqwest::{RequestBuilder, Response};

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;
use crate::providers::{BoxFuture, Upstream};

use super::types::{ChatCompletionBody, KeyInfo};

const MAX_ERROR_MESSAGE_CHARS: usize = 200;

/// reqwest-backed upstream. The server-held key never leaves this type.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl OpenRouterProvider {
    pub fn new(config: UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder.header("Authorization", format!("Bearer {}", self.config.api_key));
        if let Some(referer) = &self.config.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.config.title {
            builder = builder.header("X-Title", title);
        }
        builder
    }

    async fn send_chat(&self, body: &ChatCompletionBody) -> Result<Bytes, UpstreamError> {
        let response = self
            .authorized(self.client.post(self.config.chat_completions_url()))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.bytes().await?)
    }

    async fn fetch_key_info(&self) -> Result<KeyInfo, UpstreamError> {
        let response = self
            .authorized(self.client.get(self.config.key_info_url()))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl Upstream for OpenRouterProvider {
    fn chat_completion<'a>(
        &'a self,
        body: &'a ChatCompletionBody,
    ) -> BoxFuture<'a, Result<Bytes, UpstreamError>> {
        Box::pin(async move { self.send_chat(body).await })
    }

    fn key_info<'a>(&'a self) -> BoxFuture<'a, Result<KeyInfo, UpstreamError>> {
        Box::pin(async move { self.fetch_key_info().await })
    }
}

async fn ensure_success(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    // 错误体读取失败时仅保留状态码
    let text = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        message: error_message(&text),
    })
}

/// Pull `error.message` out of a provider error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|e| e.get("message").and_then(|m| m.as_str()).or_else(|| e.as_str()))
        .unwrap_or(body);
    message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}
