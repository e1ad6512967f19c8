//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → layer.rs (AuditLayer: request.rs builds RequestInfo → intercept)
//!     → application routes / admin routes
//!     → layer.rs (finalize with status and elapsed time)
//!     → Send to client
//! ```

pub mod layer;
pub mod request;
pub mod server;

pub use layer::{AuditLayer, AuditService};
pub use request::{request_info, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
