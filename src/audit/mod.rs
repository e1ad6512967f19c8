//! Request audit subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (RequestInfo)
//!     → interceptor.rs
//!         → classify.rs (fingerprint, abnormality check)
//!         → security::rate_limit (fixed-window decision)
//!         → buffer.rs (insert into the retention ring)
//!         → sink.rs (report abnormal / rate-limited requests)
//!     ← EntryRef
//!
//! Response sent:
//!     finalize(EntryRef, status, duration) → buffer.rs
//!
//! Operators:
//!     query.rs (filters, stats) over the buffer
//! ```

pub mod buffer;
pub mod classify;
pub mod clock;
pub mod entry;
pub mod error;
pub mod interceptor;
pub mod query;
pub mod sink;

pub use buffer::RetentionBuffer;
pub use classify::{classify, fingerprint, is_abnormal, AbnormalKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{AuditEntry, EntryRef, HeaderSnapshot, SessionSnapshot};
pub use error::AuditError;
pub use interceptor::{RequestInfo, RequestInterceptor};
pub use query::{AuditQuery, AuditStats, PENDING_STATUS};
pub use sink::{AuditSink, TracingSink};
