pub mod handlers;
pub(crate) mod request_logging;
pub mod session;
pub(crate) mod util;

use crate::config::Settings;
use crate::error::Result as AppResult;
use crate::providers::{OpenRouterProvider, Upstream};
use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Read-only after startup. Handlers share it through `Arc<AppState>`.
pub struct AppState {
    pub config: Settings,
    pub upstream: Arc<dyn Upstream>,
}

pub fn create_app(config: Settings) -> AppResult<Router> {
    let upstream = OpenRouterProvider::new(config.upstream.clone())?;
    tracing::info!(
        base_url = %config.upstream.base_url,
        model = %config.upstream.model,
        timeout_secs = config.upstream.timeout_secs,
        "Upstream provider configured"
    );

    Ok(router(AppState {
        config,
        upstream: Arc::new(upstream),
    }))
}

pub fn router(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config.server.allowed_origins);
    handlers::routes()
        .with_state(Arc::new(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// CORS：仅放行配置中精确匹配的来源
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    tracing::info!(count = origins.len(), "CORS allowed origins loaded");

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
        .allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Bytes;

    use super::AppState;
    use crate::config::settings::{AuthConfig, ServerConfig, Settings, UpstreamConfig};
    use crate::error::UpstreamError;
    use crate::providers::{BoxFuture, ChatCompletionBody, KeyInfo, Upstream};

    /// In-memory upstream that records what it was asked to do.
    pub struct FakeUpstream {
        chat_reply: Option<String>,
        key_reply: Option<KeyInfo>,
        chat_calls: Mutex<Vec<ChatCompletionBody>>,
        key_calls: AtomicUsize,
    }

    impl FakeUpstream {
        pub fn replying(raw: &str) -> Self {
            Self {
                chat_reply: Some(raw.to_string()),
                key_reply: Some(KeyInfo::default()),
                chat_calls: Mutex::new(Vec::new()),
                key_calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                chat_reply: None,
                key_reply: None,
                chat_calls: Mutex::new(Vec::new()),
                key_calls: AtomicUsize::new(0),
            }
        }

        pub fn with_key_info(mut self, info: KeyInfo) -> Self {
            self.key_reply = Some(info);
            self
        }

        pub fn chat_call_count(&self) -> usize {
            self.chat_calls.lock().unwrap().len()
        }

        pub fn last_chat_body(&self) -> Option<ChatCompletionBody> {
            self.chat_calls.lock().unwrap().last().cloned()
        }

        pub fn key_call_count(&self) -> usize {
            self.key_calls.load(Ordering::SeqCst)
        }
    }

    impl Upstream for FakeUpstream {
        fn chat_completion<'a>(
            &'a self,
            body: &'a ChatCompletionBody,
        ) -> BoxFuture<'a, Result<Bytes, UpstreamError>> {
            Box::pin(async move {
                self.chat_calls.lock().unwrap().push(body.clone());
                match &self.chat_reply {
                    Some(raw) => Ok(Bytes::from(raw.clone())),
                    None => Err(UpstreamError::Status {
                        status: 502,
                        message: "upstream unavailable".into(),
                    }),
                }
            })
        }

        fn key_info<'a>(&'a self) -> BoxFuture<'a, Result<KeyInfo, UpstreamError>> {
            Box::pin(async move {
                self.key_calls.fetch_add(1, Ordering::SeqCst);
                self.key_reply.clone().ok_or(UpstreamError::Status {
                    status: 401,
                    message: "No auth credentials found".into(),
                })
            })
        }
    }

    pub fn test_settings() -> Settings {
        Settings {
            server: ServerConfig {
                allowed_origins: vec!["https://chat.example".into()],
                ..Default::default()
            },
            upstream: UpstreamConfig {
                api_key: "sk-server-held".into(),
                model: "test/model".into(),
                ..Default::default()
            },
            auth: AuthConfig {
                frontend_api_key: "frontend-secret".into(),
                admin_username: "admin".into(),
                admin_password: "hunter2".into(),
            },
        }
    }

    pub fn test_app_state(upstream: Arc<FakeUpstream>) -> AppState {
        AppState {
            config: test_settings(),
            upstream,
        }
    }

    pub fn test_state(upstream: Arc<FakeUpstream>) -> Arc<AppState> {
        Arc::new(test_app_state(upstream))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{FakeUpstream, test_app_state};
    use super::*;
    use crate::server::session::issue_token;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_auth_or_upstream() {
        let upstream = Arc::new(FakeUpstream::failing());
        let app = router(test_app_state(upstream.clone()));

        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "ok");
        assert_eq!(upstream.chat_call_count(), 0);
        assert_eq!(upstream.key_call_count(), 0);
    }

    #[tokio::test]
    async fn chat_route_rejects_bad_key_with_401() {
        let upstream = Arc::new(FakeUpstream::replying("{}"));
        let app = router(test_app_state(upstream.clone()));

        let req = Request::post("/api/chat")
            .header("content-type", "application/json")
            .header("x-api-key", "nope")
            .body(Body::from(r#"{"messages":[]}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await, json!({ "error": "Unauthorized" }));
        assert_eq!(upstream.chat_call_count(), 0);
    }

    #[tokio::test]
    async fn login_then_usage_round_trip() {
        let upstream = Arc::new(FakeUpstream::replying("{}").with_key_info(
            serde_json::from_value(json!({ "data": { "usage": 50, "limit": 200 } })).unwrap(),
        ));
        let app = router(test_app_state(upstream));

        let login = Request::post("/admin/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username":"admin","password":"hunter2"}"#))
            .unwrap();
        let resp = app.clone().oneshot(login).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["success"], true);
        let token = body["token"].as_str().unwrap().to_string();

        let req = Request::get("/admin/usage")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["usage"]["remaining"].as_f64(), Some(150.0));
        assert_eq!(body["usage"]["percentage_used"], "25.00");
    }

    #[tokio::test]
    async fn failed_login_returns_envelope_without_token() {
        let app = router(test_app_state(Arc::new(FakeUpstream::replying("{}"))));

        let req = Request::post("/admin/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username":"admin","password":"guess"}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(resp).await,
            json!({ "success": false, "error": "Invalid credentials" })
        );
    }

    #[tokio::test]
    async fn login_without_json_body_is_invalid_credentials() {
        let app = router(test_app_state(Arc::new(FakeUpstream::replying("{}"))));

        let empty = Request::post("/admin/login").body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(empty).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(resp).await,
            json!({ "success": false, "error": "Invalid credentials" })
        );

        let wrong_type = Request::post("/admin/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username":5,"password":"x"}"#))
            .unwrap();
        let resp = app.oneshot(wrong_type).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(resp).await;
        assert_eq!(body["error"], "Invalid credentials");
        assert!(!body.to_string().contains('5'));
    }

    #[tokio::test]
    async fn stale_admin_token_is_rejected_by_route() {
        let upstream = Arc::new(FakeUpstream::replying("{}"));
        let app = router(test_app_state(upstream.clone()));
        let stale = issue_token(
            "admin",
            Utc::now() - chrono::Duration::hours(24) - chrono::Duration::seconds(1),
        );

        let req = Request::get("/admin/account")
            .header("authorization", format!("Bearer {}", stale))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(resp).await,
            json!({ "success": false, "error": "Invalid or expired session" })
        );
        assert_eq!(upstream.key_call_count(), 0);
    }

    #[tokio::test]
    async fn cors_preflight_allows_only_configured_origins() {
        let app = router(test_app_state(Arc::new(FakeUpstream::replying("{}"))));

        let preflight = |origin: &'static str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/chat")
                .header("origin", origin)
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "x-api-key,content-type")
                .body(Body::empty())
                .unwrap()
        };

        let resp = app.clone().oneshot(preflight("https://chat.example")).await.unwrap();
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "https://chat.example"
        );

        let resp = app.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }
}
