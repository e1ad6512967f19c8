//! Audit record types.

use serde::{Deserialize, Serialize};

/// Identity attached to the request by upstream authentication, if any.
///
/// Auth middleware inserts this as a request extension; the audit layer
/// copies it into the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user_id: Option<String>,
    pub user_role: Option<String>,
    pub session_id: Option<String>,
}

/// Request headers kept with each entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSnapshot {
    /// `unknown` when absent.
    pub user_agent: String,
    /// `direct` when absent.
    pub referer: String,
    /// `none` when absent.
    pub content_type: String,
}

impl HeaderSnapshot {
    pub fn new(user_agent: Option<&str>, referer: Option<&str>, content_type: Option<&str>) -> Self {
        Self {
            user_agent: user_agent.unwrap_or("unknown").to_string(),
            referer: referer.unwrap_or("direct").to_string(),
            content_type: content_type.unwrap_or("none").to_string(),
        }
    }
}

/// One audited request.
///
/// Created when the request arrives; `status_code` and `duration_ms` are
/// filled in once, when the response is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Sequence number, unique for the lifetime of the interceptor.
    pub id: u64,
    /// Arrival time, ms since epoch.
    pub timestamp_ms: u64,
    pub client_id: String,
    pub method: String,
    pub path: String,
    pub status_code: Option<u16>,
    pub abnormal: bool,
    pub rate_limited: bool,
    pub fingerprint: String,
    pub session: SessionSnapshot,
    pub headers: HeaderSnapshot,
    pub body_size: u64,
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AuditEntry {
    pub fn is_finalized(&self) -> bool {
        self.status_code.is_some()
    }
}

/// Handle returned by `intercept`, used to finalize the entry later.
///
/// Holds the slot the entry was written to and its id, so a slot that has
/// since been reused by another entry is never touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub(crate) slot: usize,
    pub(crate) id: u64,
}

impl EntryRef {
    /// A handle that matches nothing. Returned when interception failed.
    pub fn detached() -> Self {
        Self { slot: 0, id: 0 }
    }

    pub fn is_detached(&self) -> bool {
        self.id == 0
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}
