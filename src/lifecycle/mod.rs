//! Process lifecycle.
//!
//! ```text
//! SIGINT / SIGTERM → Shutdown::trigger → every subscriber stops
//!     → HTTP server drains in-flight requests → exit
//! ```

pub mod shutdown;

pub use shutdown::{wait_for_signal, Shutdown};
