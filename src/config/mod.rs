//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AuditConfig (validated, immutable)
//!     → RequestInterceptor::new / HttpServer::new
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → RequestInterceptor::apply_reload swaps the rate-limit policy
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Retention settings only take effect on restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AuditConfig, ObservabilityConfig, RateLimitConfig, RetentionConfig,
    ServerConfig,
};
pub use validation::{validate_config, ValidationError};
