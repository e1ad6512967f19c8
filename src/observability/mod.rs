//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Interceptor events (via TracingSink):
//!     → logging.rs (structured log events, target "audit")
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
