//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use request_audit::audit::{AbnormalKind, AuditEntry, AuditError, AuditSink, ManualClock};
use request_audit::config::{RateLimitConfig, RetentionConfig};
use request_audit::security::RateLimitDecision;
use request_audit::RequestInterceptor;

/// Everything the interceptor reported.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Abnormal { entry_id: u64, kind: AbnormalKind },
    RateLimited { entry_id: u64, decision: RateLimitDecision },
    InternalError(String),
    Admin { action: String, client_id: Option<String> },
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn rate_limited_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::RateLimited { .. }))
            .count()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl AuditSink for RecordingSink {
    fn abnormal(&self, entry: &AuditEntry, kind: AbnormalKind) {
        self.push(SinkEvent::Abnormal { entry_id: entry.id, kind });
    }

    fn rate_limited(&self, entry: &AuditEntry, decision: &RateLimitDecision) {
        self.push(SinkEvent::RateLimited { entry_id: entry.id, decision: *decision });
    }

    fn internal_error(&self, error: &AuditError) {
        self.push(SinkEvent::InternalError(error.to_string()));
    }

    fn admin_action(&self, action: &str, client_id: Option<&str>) {
        self.push(SinkEvent::Admin {
            action: action.to_string(),
            client_id: client_id.map(str::to_string),
        });
    }
}

pub struct Harness {
    pub interceptor: Arc<RequestInterceptor>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<RecordingSink>,
}

pub const START_MS: u64 = 1_700_000_000_000;

pub fn harness(retention: RetentionConfig, rate_limit: RateLimitConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(START_MS));
    let sink = Arc::new(RecordingSink::default());
    let interceptor =
        RequestInterceptor::with_parts(retention, rate_limit, clock.clone(), sink.clone()).unwrap();
    Harness {
        interceptor: Arc::new(interceptor),
        clock,
        sink,
    }
}

/// Retention that never sweeps on its own during a test.
pub fn retention(capacity: usize, ttl_ms: u64) -> RetentionConfig {
    RetentionConfig {
        capacity,
        ttl_ms,
        sweep_interval_ms: u64::MAX / 2,
        query_limit: 100,
    }
}

pub fn rate_limit(window_ms: u64, max_requests: u32, block_duration_ms: u64) -> RateLimitConfig {
    RateLimitConfig {
        window_ms,
        max_requests,
        block_duration_ms,
        idle_eviction_ms: 300_000,
    }
}
