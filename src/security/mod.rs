//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (count per client, report over-limit)
//!     → audit interceptor records the decision
//! ```
//!
//! # Design Decisions
//! - Report, do not enforce: the host decides whether to reject
//! - Fixed windows, not token buckets, so counts are easy to audit

pub mod rate_limit;

pub use rate_limit::{ClientLimitState, LimitReason, RateLimitDecision, RateLimitRecord, RateLimiter};
