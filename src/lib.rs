//! Request audit and rate limiting for HTTP services.

pub mod admin;
pub mod audit;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use audit::{RequestInfo, RequestInterceptor};
pub use config::AuditConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
