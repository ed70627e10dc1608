use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::server::AppState;

mod admin_account;
mod auth;
mod auth_login;
mod chat;
mod info;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(info::index))
        .route("/health", get(info::health))
        .route("/api/chat", post(chat::chat))
        // Admin
        .route("/admin/login", post(auth_login::login))
        .route("/admin/account", get(admin_account::account))
        .route("/admin/usage", get(admin_account::usage))
}
