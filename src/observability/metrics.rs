//! Metrics collection and exposition.
//!
//! # Metrics
//! - `audit_requests_total` (counter): requests recorded by the interceptor
//! - `audit_abnormal_total` (counter): flagged requests by `kind`
//! - `audit_rate_limited_total` (counter): over-limit requests by `reason`
//! - `audit_internal_errors_total` (counter): interceptions that degraded
//! - `audit_buffer_entries` (gauge): entries currently retained
//! - `audit_request_duration_ms` (histogram): finalized response durations

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::audit::AbnormalKind;

/// Install the global recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request() {
    ::metrics::counter!("audit_requests_total").increment(1);
}

pub fn record_abnormal(kind: AbnormalKind) {
    ::metrics::counter!("audit_abnormal_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_rate_limited(reason: &'static str) {
    ::metrics::counter!("audit_rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_internal_error() {
    ::metrics::counter!("audit_internal_errors_total").increment(1);
}

pub fn record_buffer_len(len: usize) {
    ::metrics::gauge!("audit_buffer_entries").set(len as f64);
}

pub fn record_duration(duration_ms: u64) {
    ::metrics::histogram!("audit_request_duration_ms").record(duration_ms as f64);
}
