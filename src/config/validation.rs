//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! All problems are collected so one run reports every bad field.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{AuditConfig, RateLimitConfig, RetentionConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A numeric setting that must be positive was zero.
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    /// An address setting could not be parsed as `ip:port`.
    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    /// Admin API enabled without a key.
    #[error("admin.api_key must not be empty when the admin API is enabled")]
    EmptyApiKey,
}

/// Validate the full configuration.
pub fn validate_config(config: &AuditConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    errors.extend(check_retention(&config.retention));
    errors.extend(check_rate_limit(&config.rate_limit));

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "server.request_timeout_secs" });
    }
    check_address(&mut errors, "server.bind_address", &config.server.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::EmptyApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks that apply to the interceptor itself, independent of the server.
pub fn check_retention(config: &RetentionConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if config.capacity == 0 {
        errors.push(ValidationError::Zero { field: "retention.capacity" });
    }
    if config.ttl_ms == 0 {
        errors.push(ValidationError::Zero { field: "retention.ttl_ms" });
    }
    if config.sweep_interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "retention.sweep_interval_ms" });
    }
    if config.query_limit == 0 {
        errors.push(ValidationError::Zero { field: "retention.query_limit" });
    }
    errors
}

pub fn check_rate_limit(config: &RateLimitConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if config.window_ms == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.window_ms" });
    }
    if config.max_requests == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.max_requests" });
    }
    if config.block_duration_ms == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.block_duration_ms" });
    }
    if config.idle_eviction_ms == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.idle_eviction_ms" });
    }
    errors
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
