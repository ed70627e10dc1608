use std::future::Future;
use std::pin::Pin;

use axum::body::Bytes;

use crate::error::UpstreamError;

pub mod openrouter;

pub use openrouter::{ChatCompletionBody, KeyData, KeyInfo, OpenRouterProvider};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// 上游供应商抽象：生产环境走 HTTP，测试中可替换为内存实现
pub trait Upstream: Send + Sync {
    /// One completion call. The provider's raw JSON body is returned unchanged.
    fn chat_completion<'a>(
        &'a self,
        body: &'a ChatCompletionBody,
    ) -> BoxFuture<'a, Result<Bytes, UpstreamError>>;

    fn key_info<'a>(&'a self) -> BoxFuture<'a, Result<KeyInfo, UpstreamError>>;
}
