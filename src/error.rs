use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Startup and infrastructure failures. Never rendered to callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failures talking to the upstream provider. Detail stays server-side.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("upstream response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

/// Caller-visible errors. The only place response bodies for failures are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Unauthorized,
    BadRequest,
    Internal,
    Admin {
        status: StatusCode,
        message: &'static str,
    },
}

impl ApiError {
    pub fn admin_unauthorized(message: &'static str) -> Self {
        Self::Admin {
            status: StatusCode::UNAUTHORIZED,
            message,
        }
    }

    pub fn admin_failure(message: &'static str) -> Self {
        Self::Admin {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Admin { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Unauthorized => json!({ "error": "Unauthorized" }),
            Self::BadRequest => json!({ "error": "Invalid request body" }),
            Self::Internal => json!({ "error": "Internal server error" }),
            Self::Admin { message, .. } => json!({ "success": false, "error": message }),
        };
        (status, Json(body)).into_response()
    }
}
