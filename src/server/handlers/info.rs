use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Chat relay API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /api/chat": "Forward a chat completion (requires x-api-key)",
            "POST /admin/login": "Exchange admin credentials for a session token",
            "GET /admin/account": "Upstream key profile (requires admin Bearer token)",
            "GET /admin/usage": "Upstream spend and remaining budget (requires admin Bearer token)",
            "GET /health": "Liveness check",
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn health_reports_iso_timestamp() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        let ts = body["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[tokio::test]
    async fn index_lists_every_route() {
        let Json(body) = index().await;
        let endpoints = body["endpoints"].as_object().unwrap();
        for route in [
            "POST /api/chat",
            "POST /admin/login",
            "GET /admin/account",
            "GET /admin/usage",
            "GET /health",
        ] {
            assert!(endpoints.contains_key(route), "missing {route}");
        }
    }
}
