use axum::{Json, extract::State, http::HeaderMap};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::auth::ensure_admin;
use crate::error::ApiError;
use crate::providers::KeyData;
use crate::server::AppState;
use crate::server::request_logging::log_upstream_failure;

const CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub label: String,
    pub usage: f64,
    pub limit: f64,
    pub is_free_tier: bool,
    pub rate_limit: Value,
}

impl From<KeyData> for AccountSummary {
    fn from(data: KeyData) -> Self {
        Self {
            label: data.label.unwrap_or_else(|| "Unknown".to_string()),
            usage: data.usage.unwrap_or(0.0),
            limit: data.limit.unwrap_or(0.0),
            is_free_tier: data.is_free_tier.unwrap_or(false),
            rate_limit: data
                .rate_limit
                .unwrap_or_else(|| Value::Object(Default::default())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub used: f64,
    pub limit: f64,
    pub remaining: f64,
    pub percentage_used: String,
    pub currency: &'static str,
}

impl From<&KeyData> for UsageSummary {
    fn from(data: &KeyData) -> Self {
        let used = data.usage.unwrap_or(0.0);
        let limit = data.limit.unwrap_or(0.0);
        let percentage = if limit > 0.0 {
            round_cents(used / limit * 100.0)
        } else {
            0.0
        };
        Self {
            used,
            limit,
            remaining: (limit - used).max(0.0),
            percentage_used: format!("{:.2}", percentage),
            currency: CURRENCY,
        }
    }
}

// `{:.2}` 对恰好的 .5 采用银行家舍入，这里先按四舍五入（远离零）取整
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    pub account: AccountSummary,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub success: bool,
    pub usage: UsageSummary,
}

pub async fn account(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AccountResponse>, ApiError> {
    ensure_admin(&headers, &app_state, Utc::now())?;

    let info = app_state.upstream.key_info().await.map_err(|e| {
        log_upstream_failure("account_info", &e);
        ApiError::admin_failure("Failed to fetch account info")
    })?;

    Ok(Json(AccountResponse {
        success: true,
        account: info.data.into(),
    }))
}

pub async fn usage(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UsageResponse>, ApiError> {
    ensure_admin(&headers, &app_state, Utc::now())?;

    let info = app_state.upstream.key_info().await.map_err(|e| {
        log_upstream_failure("usage_info", &e);
        ApiError::admin_failure("Failed to fetch usage info")
    })?;

    Ok(Json(UsageResponse {
        success: true,
        usage: UsageSummary::from(&info.data),
    }))
}
