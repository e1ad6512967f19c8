//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the audit
//! server. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the audit interceptor and its host server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    /// HTTP server settings (bind address, timeouts, client identification).
    pub server: ServerConfig,

    /// Retention buffer settings.
    pub retention: RetentionConfig,

    /// Per-client rate limiting policy.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Use the first `X-Forwarded-For` hop as the client identifier.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            trust_forwarded_for: false,
        }
    }
}

/// Retention buffer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetentionConfig {
    /// Maximum number of audit entries held in memory.
    pub capacity: usize,

    /// Entries older than this are dropped by the sweep.
    pub ttl_ms: u64,

    /// Minimum time between two sweeps.
    pub sweep_interval_ms: u64,

    /// Result limit applied to queries that do not set one.
    pub query_limit: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            ttl_ms: 3_600_000,
            sweep_interval_ms: 300_000,
            query_limit: 100,
        }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests allowed per window; the next one is flagged.
    pub max_requests: u32,

    /// How long a client stays flagged after exceeding the limit.
    pub block_duration_ms: u64,

    /// Records idle for this long (and not blocked) are evicted on sweep.
    pub idle_eviction_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 100,
            block_duration_ms: 900_000,
            idle_eviction_ms: 300_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes on the server.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
