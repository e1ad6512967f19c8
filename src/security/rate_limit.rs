//! Fixed-window per-client rate limiting.
//!
//! Counts requests per client identifier in discrete windows. Exceeding the
//! window budget places the client in a timed block. The limiter only reports
//! a decision; the caller decides whether to enforce it.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::RateLimitConfig;

/// Per-client counter state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Requests counted in the current window.
    pub count: u32,
    /// Start of the current window (ms since epoch).
    pub window_start_ms: u64,
    /// Whether the client is under a block.
    pub blocked: bool,
    /// End of the block (ms since epoch); 0 when never blocked.
    pub blocked_until_ms: u64,
    /// Last request seen from this client, used for idle eviction.
    pub last_seen_ms: u64,
}

impl RateLimitRecord {
    fn fresh(now_ms: u64) -> Self {
        Self {
            count: 0,
            window_start_ms: now_ms,
            blocked: false,
            blocked_until_ms: 0,
            last_seen_ms: now_ms,
        }
    }

    fn reset_window(&mut self, now_ms: u64) {
        self.count = 0;
        self.window_start_ms = now_ms;
        self.blocked = false;
    }
}

/// Why a request was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitReason {
    /// This request pushed the window count over the limit.
    LimitExceeded,
    /// The client is still inside an earlier block.
    TemporarilyBlocked,
}

impl LimitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitReason::LimitExceeded => "limit exceeded",
            LimitReason::TemporarilyBlocked => "temporarily blocked",
        }
    }
}

impl fmt::Display for LimitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a rate limit evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub limited: bool,
    pub reason: Option<LimitReason>,
    pub blocked_until_ms: Option<u64>,
}

impl RateLimitDecision {
    pub fn allowed() -> Self {
        Self {
            limited: false,
            reason: None,
            blocked_until_ms: None,
        }
    }

    fn limited(reason: LimitReason, blocked_until_ms: u64) -> Self {
        Self {
            limited: true,
            reason: Some(reason),
            blocked_until_ms: Some(blocked_until_ms),
        }
    }
}

/// A client's record as exposed to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientLimitState {
    pub client_id: String,
    #[serde(flatten)]
    pub record: RateLimitRecord,
}

/// Fixed-window rate limiter keyed by client identifier.
///
/// Records live in a sharded map so clients on different shards never contend.
/// All reads and writes for one client happen under that client's shard lock.
pub struct RateLimiter {
    records: DashMap<String, RateLimitRecord>,
    policy: ArcSwap<RateLimitConfig>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitConfig) -> Self {
        Self {
            records: DashMap::new(),
            policy: ArcSwap::from_pointee(policy),
        }
    }

    /// Current policy.
    pub fn policy(&self) -> Arc<RateLimitConfig> {
        self.policy.load_full()
    }

    /// Replace the policy. Existing counters are kept.
    pub fn update_policy(&self, policy: RateLimitConfig) {
        self.policy.store(Arc::new(policy));
    }

    /// Count one request from `client_id` at `now_ms` and decide whether it is limited.
    pub fn evaluate(&self, client_id: &str, now_ms: u64) -> RateLimitDecision {
        let policy = self.policy.load();

        let mut entry = self
            .records
            .entry(client_id.to_string())
            .or_insert_with(|| RateLimitRecord::fresh(now_ms));
        let record = entry.value_mut();
        record.last_seen_ms = now_ms;

        if now_ms.saturating_sub(record.window_start_ms) >= policy.window_ms && !record.blocked {
            record.reset_window(now_ms);
        }

        if record.blocked {
            if now_ms < record.blocked_until_ms {
                return RateLimitDecision::limited(
                    LimitReason::TemporarilyBlocked,
                    record.blocked_until_ms,
                );
            }
            record.reset_window(now_ms);
        }

        // Saturating: extreme policies mean "never limit" or "block for good".
        record.count = record.count.saturating_add(1);

        if record.count > policy.max_requests {
            record.blocked = true;
            record.blocked_until_ms = now_ms.saturating_add(policy.block_duration_ms);
            return RateLimitDecision::limited(LimitReason::LimitExceeded, record.blocked_until_ms);
        }

        RateLimitDecision::allowed()
    }

    /// Forget everything about a client. Returns whether a record existed.
    pub fn clear(&self, client_id: &str) -> bool {
        self.records.remove(client_id).is_some()
    }

    /// Drop records that are idle and not serving a block.
    pub fn evict_idle(&self, now_ms: u64) -> usize {
        let idle_ms = self.policy.load().idle_eviction_ms;
        let before = self.records.len();
        self.records.retain(|_, record| {
            let serving_block = record.blocked && now_ms < record.blocked_until_ms;
            serving_block || now_ms.saturating_sub(record.last_seen_ms) < idle_ms
        });
        before.saturating_sub(self.records.len())
    }

    pub fn get(&self, client_id: &str) -> Option<RateLimitRecord> {
        self.records.get(client_id).map(|r| r.value().clone())
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, sorted by client identifier.
    pub fn snapshot(&self) -> Vec<ClientLimitState> {
        let mut states: Vec<_> = self
            .records
            .iter()
            .map(|r| ClientLimitState {
                client_id: r.key().clone(),
                record: r.value().clone(),
            })
            .collect();
        states.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window_ms: 1_000,
            max_requests,
            block_duration_ms: 2_000,
            idle_eviction_ms: 5_000,
        })
    }

    #[test]
    fn test_unbounded_block_duration_saturates() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_ms: 1_000,
            max_requests: 1,
            block_duration_ms: u64::MAX,
            idle_eviction_ms: 5_000,
        });
        assert!(!limiter.evaluate("a", 1_700_000_000_000).limited);

        let decision = limiter.evaluate("a", 1_700_000_000_000);
        assert_eq!(decision.reason, Some(LimitReason::LimitExceeded));
        assert_eq!(decision.blocked_until_ms, Some(u64::MAX));
        assert!(limiter.evaluate("a", u64::MAX - 1).limited);
    }

    #[test]
    fn test_count_saturates_at_max_requests() {
        let limiter = limiter(u32::MAX);
        limiter.records.insert(
            "a".to_string(),
            RateLimitRecord {
                count: u32::MAX,
                window_start_ms: 0,
                blocked: false,
                blocked_until_ms: 0,
                last_seen_ms: 0,
            },
        );

        assert!(!limiter.evaluate("a", 10).limited);
        assert_eq!(limiter.get("a").unwrap().count, u32::MAX);
    }

    #[test]
    fn test_limit_boundary() {
        let limiter = limiter(3);
        for _ in 0..3 {
            assert!(!limiter.evaluate("a", 100).limited);
        }

        let decision = limiter.evaluate("a", 100);
        assert!(decision.limited);
        assert_eq!(decision.reason, Some(LimitReason::LimitExceeded));
        assert_eq!(decision.blocked_until_ms, Some(2_100));
    }

    #[test]
    fn test_blocked_requests_do_not_count() {
        let limiter = limiter(1);
        limiter.evaluate("a", 0);
        limiter.evaluate("a", 0);
        let count_at_block = limiter.get("a").unwrap().count;

        let decision = limiter.evaluate("a", 500);
        assert_eq!(decision.reason, Some(LimitReason::TemporarilyBlocked));
        assert_eq!(limiter.get("a").unwrap().count, count_at_block);
    }

    #[test]
    fn test_block_expires_at_boundary() {
        let limiter = limiter(1);
        limiter.evaluate("a", 0);
        assert!(limiter.evaluate("a", 0).limited);

        assert!(limiter.evaluate("a", 1_999).limited);
        let decision = limiter.evaluate("a", 2_000);
        assert!(!decision.limited);

        let record = limiter.get("a").unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.window_start_ms, 2_000);
        assert!(!record.blocked);
    }

    #[test]
    fn test_window_rollover_resets_count() {
        let limiter = limiter(2);
        limiter.evaluate("a", 0);
        limiter.evaluate("a", 10);

        let decision = limiter.evaluate("a", 1_000);
        assert!(!decision.limited);
        assert_eq!(limiter.get("a").unwrap().count, 1);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1);
        limiter.evaluate("a", 0);
        assert!(limiter.evaluate("a", 0).limited);
        assert!(!limiter.evaluate("b", 0).limited);
    }

    #[test]
    fn test_clear_restores_fresh_state() {
        let limiter = limiter(1);
        limiter.evaluate("a", 0);
        limiter.evaluate("a", 0);
        assert!(limiter.clear("a"));
        assert!(!limiter.clear("a"));
        assert!(!limiter.evaluate("a", 1).limited);
    }

    #[test]
    fn test_evict_idle_keeps_active_blocks() {
        let limiter = limiter(1);
        limiter.evaluate("idle", 0);
        limiter.evaluate("blocked", 0);
        limiter.evaluate("blocked", 0);
        limiter.evaluate("recent", 4_000);

        // Block on "blocked" ends at 2_000, so it is idle by 6_000 too.
        assert_eq!(limiter.evict_idle(6_000), 2);
        assert!(limiter.get("recent").is_some());
        assert!(limiter.get("idle").is_none());
    }

    #[test]
    fn test_evict_idle_spares_long_blocks() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_ms: 1_000,
            max_requests: 1,
            block_duration_ms: 60_000,
            idle_eviction_ms: 5_000,
        });
        limiter.evaluate("a", 0);
        limiter.evaluate("a", 0);
        assert_eq!(limiter.evict_idle(10_000), 0);
        assert!(limiter.evaluate("a", 10_000).limited);
    }

    #[test]
    fn test_policy_update_applies_to_existing_records() {
        let limiter = limiter(5);
        limiter.evaluate("a", 0);
        limiter.evaluate("a", 0);

        limiter.update_policy(RateLimitConfig {
            max_requests: 2,
            ..limiter.policy().as_ref().clone()
        });
        assert!(limiter.evaluate("a", 0).limited);
    }

    #[test]
    fn test_snapshot_sorted_by_client() {
        let limiter = limiter(5);
        limiter.evaluate("b", 0);
        limiter.evaluate("a", 0);
        let ids: Vec<_> = limiter.snapshot().into_iter().map(|s| s.client_id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
