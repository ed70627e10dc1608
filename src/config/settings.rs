use serde::Deserialize;
use std::path::Path;

use crate::error::{GatewayError, Result as AppResult};

pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Exact-match CORS origins. Empty means no cross-origin access.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Sent as `HTTP-Referer` when present.
    pub referer: Option<String>,
    /// Sent as `X-Title` when present.
    pub title: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            api_key: String::new(),
            model: String::new(),
            timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            referer: None,
            title: None,
        }
    }
}

impl UpstreamConfig {
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub fn key_info_url(&self) -> String {
        format!("{}/key", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub frontend_api_key: String,
    pub admin_username: String,
    pub admin_password: String,
}

impl Settings {
    /// 加载顺序：配置文件（可选）→ `.env` → 进程环境变量，最后校验必填项
    pub fn load() -> AppResult<Self> {
        let mut settings = match Self::find_config_file() {
            Some(path) => Self::from_file(&path)?,
            None => Settings::default(),
        };

        // A missing .env is normal in container deployments.
        let _ = dotenvy::dotenv();
        settings.apply_env(|name| std::env::var(name).ok())?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn find_config_file() -> Option<String> {
        let possible_names = ["custom-config.toml", "config.toml"];

        possible_names
            .iter()
            .find(|name| Path::new(name).exists())
            .map(|name| name.to_string())
    }

    /// Overlay values from the environment. Blank variables are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = v
                .trim()
                .parse()
                .map_err(|_| GatewayError::Config(format!("invalid PORT `{}`", v)))?;
        }
        if let Some(v) = get("ALLOWED_ORIGINS") {
            self.server.allowed_origins = parse_origins(&v);
        }

        if let Some(v) = get("OPENROUTER_BASE_URL") {
            self.upstream.base_url = v;
        }
        if let Some(v) = get("OPENROUTER_API_KEY") {
            self.upstream.api_key = v;
        }
        if let Some(v) = get("OPENROUTER_MODEL") {
            self.upstream.model = v;
        }
        if let Some(v) = get("UPSTREAM_TIMEOUT_SECS") {
            self.upstream.timeout_secs = v.trim().parse().map_err(|_| {
                GatewayError::Config(format!("invalid UPSTREAM_TIMEOUT_SECS `{}`", v))
            })?;
        }
        if let Some(v) = get("OPENROUTER_REFERER") {
            self.upstream.referer = Some(v);
        }
        if let Some(v) = get("OPENROUTER_TITLE") {
            self.upstream.title = Some(v);
        }

        if let Some(v) = get("FRONTEND_API_KEY") {
            self.auth.frontend_api_key = v;
        }
        if let Some(v) = get("ADMIN_USERNAME") {
            self.auth.admin_username = v;
        }
        if let Some(v) = get("ADMIN_PASSWORD") {
            self.auth.admin_password = v;
        }

        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        let required = [
            ("upstream.api_key / OPENROUTER_API_KEY", &self.upstream.api_key),
            ("upstream.model / OPENROUTER_MODEL", &self.upstream.model),
            ("auth.frontend_api_key / FRONTEND_API_KEY", &self.auth.frontend_api_key),
            ("auth.admin_username / ADMIN_USERNAME", &self.auth.admin_username),
            ("auth.admin_password / ADMIN_PASSWORD", &self.auth.admin_password),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(GatewayError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(GatewayError::Config(
                "upstream timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
