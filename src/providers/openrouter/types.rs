use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TEMPERATURE: f64 = 0.8;
pub const DEFAULT_TOP_P: f64 = 1.0;

/// Body forwarded to `/chat/completions`. `messages` and the sampling values are
/// passed through untouched; the provider decides whether their shape is acceptable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionBody {
    pub model: String,
    pub messages: Value,
    pub temperature: Value,
    pub top_p: Value,
}

/// `GET /key` response envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KeyInfo {
    #[serde(default)]
    pub data: KeyData,
}

// 上游字段均可能缺失；`limit: null` 表示无限额度
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KeyData {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub usage: Option<f64>,
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub is_free_tier: Option<bool>,
    #[serde(default)]
    pub rate_limit: Option<Value>,
}
