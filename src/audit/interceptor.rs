//! The request interceptor.
//!
//! # Responsibilities
//! - Fingerprint, classify, and rate-limit every inbound request
//! - Keep a bounded, TTL-limited history of recent requests
//! - Answer operator queries and statistics over that history
//!
//! # Design Decisions
//! - Observe only: `intercept` never rejects, delays, or fails a request
//! - Retention buffer behind one mutex; rate-limit records sharded per client
//! - Sweeps are lazy, triggered by traffic, claimed with a compare-exchange
//!   so only one request pays for each sweep

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audit::buffer::RetentionBuffer;
use crate::audit::classify::{classify, fingerprint};
use crate::audit::clock::{Clock, SystemClock};
use crate::audit::entry::{AuditEntry, EntryRef, HeaderSnapshot, SessionSnapshot};
use crate::audit::error::AuditError;
use crate::audit::query::{compute_stats, run_query, AuditQuery, AuditStats};
use crate::audit::sink::{AuditSink, TracingSink};
use crate::config::validation::{check_rate_limit, check_retention};
use crate::config::{AuditConfig, RateLimitConfig, RetentionConfig};
use crate::observability::metrics;
use crate::security::rate_limit::{ClientLimitState, RateLimitRecord, RateLimiter};

/// What the interceptor needs to know about an inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub client_id: String,
    pub method: String,
    pub path: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    /// Raw `content-length` header value.
    pub content_length: Option<String>,
    pub session: Option<SessionSnapshot>,
    pub request_id: Option<String>,
}

impl RequestInfo {
    pub fn new(
        client_id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set one of the headers the interceptor reads. Unknown names are ignored.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match name.to_ascii_lowercase().as_str() {
            "user-agent" => self.user_agent = value,
            "referer" => self.referer = value,
            "content-type" => self.content_type = value,
            "authorization" => self.authorization = value,
            "content-length" => self.content_length = value,
            "x-request-id" => self.request_id = value,
            _ => {}
        }
        self
    }

    pub fn with_session(mut self, session: SessionSnapshot) -> Self {
        self.session = Some(session);
        self
    }

    fn body_size(&self) -> u64 {
        self.content_length
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}

pub struct RequestInterceptor {
    retention: RetentionConfig,
    buffer: Mutex<RetentionBuffer>,
    limiter: RateLimiter,
    last_sweep_ms: AtomicU64,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn AuditSink>,
}

impl RequestInterceptor {
    /// Build an interceptor on the wall clock that reports through `tracing`.
    pub fn new(retention: RetentionConfig, rate_limit: RateLimitConfig) -> Result<Self, AuditError> {
        Self::with_parts(retention, rate_limit, Arc::new(SystemClock), Arc::new(TracingSink))
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        Self::new(config.retention.clone(), config.rate_limit.clone())
    }

    /// Build with an explicit clock and sink.
    pub fn with_parts(
        retention: RetentionConfig,
        rate_limit: RateLimitConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn AuditSink>,
    ) -> Result<Self, AuditError> {
        let mut errors = check_retention(&retention);
        errors.extend(check_rate_limit(&rate_limit));
        if !errors.is_empty() {
            return Err(AuditError::InvalidConfig(errors));
        }

        let now = clock.now_ms();
        Ok(Self {
            buffer: Mutex::new(RetentionBuffer::new(retention.capacity)),
            limiter: RateLimiter::new(rate_limit),
            last_sweep_ms: AtomicU64::new(now),
            retention,
            clock,
            sink,
        })
    }

    /// Record an inbound request. Never fails; the request always proceeds.
    ///
    /// Returns the handle to pass to [`finalize`](Self::finalize). If recording
    /// failed the handle is detached and finalizing it does nothing.
    pub fn intercept(&self, request: &RequestInfo) -> EntryRef {
        match self.try_intercept(request) {
            Ok(entry_ref) => entry_ref,
            Err(e) => {
                self.sink.internal_error(&e);
                EntryRef::detached()
            }
        }
    }

    fn try_intercept(&self, request: &RequestInfo) -> Result<EntryRef, AuditError> {
        let now = self.clock.now_ms();
        let fingerprint = fingerprint(
            &request.client_id,
            &request.method,
            &request.path,
            request.authorization.as_deref(),
        );

        self.maybe_sweep(now)?;

        let decision = self.limiter.evaluate(&request.client_id, now);
        let kind = classify(
            &request.path,
            &request.method,
            request.user_agent.as_deref().unwrap_or(""),
        );

        let entry = AuditEntry {
            id: 0,
            timestamp_ms: now,
            client_id: request.client_id.clone(),
            method: request.method.clone(),
            path: request.path.clone(),
            status_code: None,
            abnormal: kind.is_some(),
            rate_limited: decision.limited,
            fingerprint,
            session: request.session.clone().unwrap_or_default(),
            headers: HeaderSnapshot::new(
                request.user_agent.as_deref(),
                request.referer.as_deref(),
                request.content_type.as_deref(),
            ),
            body_size: request.body_size(),
            duration_ms: None,
            request_id: request.request_id.clone(),
        };

        let (entry_ref, flagged, len) = {
            let mut buffer = self.lock_buffer()?;
            let entry_ref = buffer.insert(entry);
            let flagged = if kind.is_some() || decision.limited {
                buffer.get(entry_ref).cloned()
            } else {
                None
            };
            (entry_ref, flagged, buffer.len())
        };

        metrics::record_request();
        metrics::record_buffer_len(len);

        if let Some(entry) = flagged {
            if let Some(kind) = kind {
                self.sink.abnormal(&entry, kind);
            }
            if decision.limited {
                self.sink.rate_limited(&entry, &decision);
            }
        }

        Ok(entry_ref)
    }

    fn maybe_sweep(&self, now: u64) -> Result<(), AuditError> {
        let last = self.last_sweep_ms.load(Ordering::Acquire);
        if now.saturating_sub(last) <= self.retention.sweep_interval_ms {
            return Ok(());
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Another request claimed this sweep.
            return Ok(());
        }

        let removed = self.lock_buffer()?.sweep(now, self.retention.ttl_ms);
        let evicted = self.limiter.evict_idle(now);
        tracing::debug!(removed, evicted, "Retention sweep finished");
        Ok(())
    }

    /// Record the response for an intercepted request.
    ///
    /// A no-op when the entry has been evicted or was already finalized.
    /// Returns whether an entry was updated.
    pub fn finalize(&self, entry_ref: EntryRef, status_code: u16, duration_ms: u64) -> bool {
        if entry_ref.is_detached() {
            return false;
        }
        let updated = match self.lock_buffer() {
            Ok(mut buffer) => buffer.finalize(entry_ref, status_code, duration_ms),
            Err(e) => {
                self.sink.internal_error(&e);
                false
            }
        };
        if updated {
            metrics::record_duration(duration_ms);
        }
        updated
    }

    /// Matching entries, newest first.
    pub fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        let buffer = self.lock_buffer()?;
        run_query(buffer.iter(), query, self.retention.query_limit)
    }

    pub fn stats(&self) -> Result<AuditStats, AuditError> {
        let now = self.clock.now_ms();
        let buffer = self.lock_buffer()?;
        Ok(compute_stats(buffer.iter(), now))
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self.lock_buffer()?.snapshot())
    }

    /// Look up one entry by its handle, if it is still retained.
    pub fn entry(&self, entry_ref: EntryRef) -> Result<Option<AuditEntry>, AuditError> {
        Ok(self.lock_buffer()?.get(entry_ref).cloned())
    }

    /// Forget a client's rate-limit state. Returns whether it had any.
    pub fn clear_rate_limit(&self, client_id: &str) -> bool {
        let existed = self.limiter.clear(client_id);
        self.sink.admin_action("clear_rate_limit", Some(client_id));
        existed
    }

    /// Drop every retained entry. Rate-limit state is untouched.
    pub fn clear_all(&self) {
        let mut buffer = self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        buffer.clear();
        drop(buffer);
        // A cleared buffer is consistent again.
        self.buffer.clear_poison();
        metrics::record_buffer_len(0);
        self.sink.admin_action("clear_all", None);
    }

    pub fn rate_limit_status(&self, client_id: &str) -> Option<RateLimitRecord> {
        self.limiter.get(client_id)
    }

    /// Every tracked client's rate-limit record.
    pub fn rate_limits(&self) -> Vec<ClientLimitState> {
        self.limiter.snapshot()
    }

    pub fn rate_limit_policy(&self) -> Arc<RateLimitConfig> {
        self.limiter.policy()
    }

    pub fn retention(&self) -> &RetentionConfig {
        &self.retention
    }

    /// Apply a reloaded configuration.
    ///
    /// The rate-limit policy is swapped in place. Retention settings are fixed
    /// for the life of the interceptor; changes to them are logged and ignored.
    pub fn apply_reload(&self, config: &AuditConfig) -> Result<(), AuditError> {
        let errors = check_rate_limit(&config.rate_limit);
        if !errors.is_empty() {
            return Err(AuditError::InvalidConfig(errors));
        }

        if config.retention != self.retention {
            tracing::warn!("Retention settings changed; restart required to apply them");
        }
        if *self.limiter.policy() != config.rate_limit {
            self.limiter.update_policy(config.rate_limit.clone());
            tracing::info!(
                window_ms = config.rate_limit.window_ms,
                max_requests = config.rate_limit.max_requests,
                block_duration_ms = config.rate_limit.block_duration_ms,
                "Rate limit policy reloaded"
            );
        }
        Ok(())
    }

    fn lock_buffer(&self) -> Result<MutexGuard<'_, RetentionBuffer>, AuditError> {
        self.buffer
            .lock()
            .map_err(|_| AuditError::LockPoisoned("retention buffer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::clock::ManualClock;

    fn interceptor(clock: Arc<ManualClock>) -> RequestInterceptor {
        RequestInterceptor::with_parts(
            RetentionConfig {
                capacity: 4,
                ttl_ms: 1_000,
                sweep_interval_ms: 100,
                query_limit: 10,
            },
            RateLimitConfig {
                window_ms: 1_000,
                max_requests: 2,
                block_duration_ms: 2_000,
                idle_eviction_ms: 5_000,
            },
            clock,
            Arc::new(TracingSink),
        )
        .unwrap()
    }

    #[derive(Default)]
    struct ErrorCountingSink {
        errors: AtomicU64,
    }

    impl AuditSink for ErrorCountingSink {
        fn abnormal(&self, _: &AuditEntry, _: crate::audit::AbnormalKind) {}
        fn rate_limited(&self, _: &AuditEntry, _: &crate::security::RateLimitDecision) {}
        fn internal_error(&self, error: &AuditError) {
            assert!(matches!(error, AuditError::LockPoisoned(_)));
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
        fn admin_action(&self, _: &str, _: Option<&str>) {}
    }

    #[test]
    fn test_poisoned_buffer_degrades_then_recovers_on_clear() {
        let sink = Arc::new(ErrorCountingSink::default());
        let interceptor = Arc::new(
            RequestInterceptor::with_parts(
                RetentionConfig::default(),
                RateLimitConfig::default(),
                Arc::new(ManualClock::new(1_000)),
                sink.clone(),
            )
            .unwrap(),
        );

        let holder = Arc::clone(&interceptor);
        let joined = std::thread::spawn(move || {
            let _guard = holder.buffer.lock().unwrap();
            panic!("panic while holding the retention buffer");
        })
        .join();
        assert!(joined.is_err());
        assert!(interceptor.buffer.is_poisoned());

        let entry_ref = interceptor.intercept(&RequestInfo::new("a", "GET", "/"));
        assert!(entry_ref.is_detached());
        assert_eq!(sink.errors.load(Ordering::SeqCst), 1);
        assert!(!interceptor.finalize(entry_ref, 200, 1));
        assert!(matches!(interceptor.stats(), Err(AuditError::LockPoisoned(_))));
        assert!(interceptor.query(&AuditQuery::default()).is_err());

        interceptor.clear_all();
        assert!(!interceptor.buffer.is_poisoned());

        let entry_ref = interceptor.intercept(&RequestInfo::new("a", "GET", "/after"));
        assert!(!entry_ref.is_detached());
        assert!(interceptor.finalize(entry_ref, 200, 1));
        let entries = interceptor.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/after");
        assert_eq!(sink.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = RequestInterceptor::new(
            RetentionConfig { capacity: 0, ..Default::default() },
            RateLimitConfig::default(),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("retention.capacity"));
    }

    #[test]
    fn test_intercept_records_request_fields() {
        let clock = Arc::new(ManualClock::new(5_000));
        let interceptor = interceptor(clock);
        let request = RequestInfo::new("10.0.0.1", "POST", "/orders")
            .with_header("User-Agent", "Mozilla/5.0")
            .with_header("Content-Length", "42")
            .with_header("Authorization", "Bearer abc")
            .with_session(SessionSnapshot {
                user_id: Some("u1".into()),
                user_role: Some("admin".into()),
                session_id: Some("s1".into()),
            });

        let entry_ref = interceptor.intercept(&request);
        let entry = interceptor.entry(entry_ref).unwrap().unwrap();

        assert_eq!(entry.timestamp_ms, 5_000);
        assert_eq!(entry.fingerprint, "8:10.0.0.1|4:POST|7:/orders|auth");
        assert!(!entry.fingerprint.contains("abc"));
        assert_eq!(entry.body_size, 42);
        assert_eq!(entry.headers.user_agent, "Mozilla/5.0");
        assert_eq!(entry.headers.referer, "direct");
        assert_eq!(entry.headers.content_type, "none");
        assert_eq!(entry.session.user_role.as_deref(), Some("admin"));
        assert_eq!(entry.status_code, None);
        assert_eq!(entry.duration_ms, None);
        assert!(!entry.abnormal);
        assert!(!entry.rate_limited);
    }

    #[test]
    fn test_unparsable_content_length_is_zero() {
        let interceptor = interceptor(Arc::new(ManualClock::new(0)));
        let entry_ref =
            interceptor.intercept(&RequestInfo::new("c", "GET", "/").with_header("content-length", "lots"));
        assert_eq!(interceptor.entry(entry_ref).unwrap().unwrap().body_size, 0);
    }

    #[test]
    fn test_finalize_sets_response_fields_once() {
        let interceptor = interceptor(Arc::new(ManualClock::new(0)));
        let entry_ref = interceptor.intercept(&RequestInfo::new("c", "GET", "/"));

        assert!(interceptor.finalize(entry_ref, 201, 7));
        assert!(!interceptor.finalize(entry_ref, 500, 70));

        let entry = interceptor.entry(entry_ref).unwrap().unwrap();
        assert_eq!(entry.status_code, Some(201));
        assert_eq!(entry.duration_ms, Some(7));
    }

    #[test]
    fn test_sweep_waits_for_interval() {
        let clock = Arc::new(ManualClock::new(0));
        let interceptor = interceptor(clock.clone());
        interceptor.intercept(&RequestInfo::new("c", "GET", "/old"));

        // Past both the TTL and the sweep interval: "/old" goes.
        clock.set(1_050);
        interceptor.intercept(&RequestInfo::new("c", "GET", "/new"));
        let paths: Vec<_> = interceptor.entries().unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["/new"]);

        // Within the interval: no sweep even though "/new" will age out.
        clock.set(1_100);
        interceptor.intercept(&RequestInfo::new("c", "GET", "/newer"));
        assert_eq!(interceptor.entries().unwrap().len(), 2);
    }

    #[test]
    fn test_apply_reload_swaps_rate_limit_policy() {
        let interceptor = interceptor(Arc::new(ManualClock::new(0)));
        let mut config = AuditConfig::default();
        config.retention = interceptor.retention().clone();
        config.rate_limit.max_requests = 1;
        interceptor.apply_reload(&config).unwrap();

        assert_eq!(interceptor.rate_limit_policy().max_requests, 1);
        interceptor.intercept(&RequestInfo::new("c", "GET", "/"));
        let second = interceptor.intercept(&RequestInfo::new("c", "GET", "/"));
        assert!(interceptor.entry(second).unwrap().unwrap().rate_limited);
    }

    #[test]
    fn test_apply_reload_rejects_invalid_policy() {
        let interceptor = interceptor(Arc::new(ManualClock::new(0)));
        let mut config = AuditConfig::default();
        config.rate_limit.window_ms = 0;
        assert!(matches!(
            interceptor.apply_reload(&config),
            Err(AuditError::InvalidConfig(_))
        ));
        assert_eq!(interceptor.rate_limit_policy().window_ms, 1_000);
    }
}
