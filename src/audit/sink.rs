//! Where flagged requests are reported.
//!
//! The interceptor never writes to a log directly. It hands events to an
//! `AuditSink`, so hosts can route them to alerting without touching the
//! interceptor. `TracingSink` is the default.

use crate::audit::classify::AbnormalKind;
use crate::audit::entry::AuditEntry;
use crate::audit::error::AuditError;
use crate::observability::metrics;
use crate::security::rate_limit::RateLimitDecision;

pub trait AuditSink: Send + Sync {
    /// A request matched a probe pattern.
    fn abnormal(&self, entry: &AuditEntry, kind: AbnormalKind);

    /// A request was over its client's rate limit.
    fn rate_limited(&self, entry: &AuditEntry, decision: &RateLimitDecision);

    /// Interception failed and the request went through unclassified.
    fn internal_error(&self, error: &AuditError);

    /// An operator changed interceptor state.
    fn admin_action(&self, action: &str, client_id: Option<&str>);
}

/// Emits structured `tracing` events and Prometheus counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn abnormal(&self, entry: &AuditEntry, kind: AbnormalKind) {
        tracing::warn!(
            target: "audit",
            entry_id = entry.id,
            client = %entry.client_id,
            method = %entry.method,
            path = %entry.path,
            kind = %kind,
            user_agent = %entry.headers.user_agent,
            fingerprint = %entry.fingerprint,
            "Abnormal request"
        );
        metrics::record_abnormal(kind);
    }

    fn rate_limited(&self, entry: &AuditEntry, decision: &RateLimitDecision) {
        let reason = decision.reason.map(|r| r.as_str()).unwrap_or("unknown");
        tracing::warn!(
            target: "audit",
            entry_id = entry.id,
            client = %entry.client_id,
            method = %entry.method,
            path = %entry.path,
            reason,
            blocked_until_ms = ?decision.blocked_until_ms,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited(reason);
    }

    fn internal_error(&self, error: &AuditError) {
        tracing::error!(target: "audit", error = %error, "Audit interception failed, request passed unclassified");
        metrics::record_internal_error();
    }

    fn admin_action(&self, action: &str, client_id: Option<&str>) {
        tracing::info!(target: "audit", action, client = ?client_id, "Audit admin action");
    }
}
