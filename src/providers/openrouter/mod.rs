pub mod client;
pub mod types;

pub use client::OpenRouterProvider;
pub use types::{ChatCompletionBody, KeyData, KeyInfo};
