//! Operator API over the audit trail.
//!
//! All routes require the configured bearer key.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/audit/logs", get(get_logs).delete(delete_logs))
        .route("/admin/audit/stats", get(get_stats))
        .route("/admin/audit/rate-limits", get(get_rate_limits))
        .route("/admin/audit/rate-limits/{client_id}", delete(delete_rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
