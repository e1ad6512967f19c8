use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::audit::{AuditEntry, AuditError, AuditQuery, AuditStats};
use crate::http::server::AppState;
use crate::security::ClientLimitState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub retained_entries: usize,
    pub tracked_clients: usize,
}

/// Error body returned by the admin API.
#[derive(Debug)]
pub struct AdminError(AuditError);

impl From<AuditError> for AdminError {
    fn from(e: AuditError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AuditError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub async fn get_status(State(state): State<AppState>) -> Result<Json<SystemStatus>, AdminError> {
    let stats = state.interceptor.stats()?;
    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        retained_entries: stats.total_entries,
        tracked_clients: state.interceptor.rate_limits().len(),
    }))
}

pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AdminError> {
    Ok(Json(state.interceptor.query(&query)?))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<AuditStats>, AdminError> {
    Ok(Json(state.interceptor.stats()?))
}

pub async fn get_rate_limits(State(state): State<AppState>) -> Json<Vec<ClientLimitState>> {
    Json(state.interceptor.rate_limits())
}

pub async fn delete_rate_limit(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> StatusCode {
    state.interceptor.clear_rate_limit(&client_id);
    StatusCode::NO_CONTENT
}

pub async fn delete_logs(State(state): State<AppState>) -> StatusCode {
    state.interceptor.clear_all();
    StatusCode::NO_CONTENT
}
