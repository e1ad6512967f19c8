//! Read-only views over the retention buffer: filtered queries and summary stats.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::audit::entry::AuditEntry;
use crate::audit::error::AuditError;

/// Entries newer than this count toward `last_hour_entries`.
const LAST_HOUR_MS: u64 = 3_600_000;

/// Status key used for entries whose response has not been recorded.
pub const PENDING_STATUS: &str = "pending";

/// Filter for `RequestInterceptor::query`. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditQuery {
    pub abnormal_only: bool,
    pub rate_limited_only: bool,
    /// Only entries at or after this time (ms since epoch).
    pub since: Option<u64>,
    pub client_id: Option<String>,
    pub status_code: Option<u16>,
    pub method: Option<String>,
    /// Regular expression searched anywhere in the path.
    pub path_pattern: Option<String>,
    /// Result cap; falls back to the configured default.
    pub limit: Option<usize>,
}

struct CompiledQuery<'q> {
    query: &'q AuditQuery,
    path_regex: Option<Regex>,
}

impl<'q> CompiledQuery<'q> {
    fn new(query: &'q AuditQuery) -> Result<Self, AuditError> {
        let path_regex = query.path_pattern.as_deref().map(Regex::new).transpose()?;
        Ok(Self { query, path_regex })
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        let q = self.query;
        if q.abnormal_only && !entry.abnormal {
            return false;
        }
        if q.rate_limited_only && !entry.rate_limited {
            return false;
        }
        if q.since.is_some_and(|since| entry.timestamp_ms < since) {
            return false;
        }
        if q.client_id.as_ref().is_some_and(|c| *c != entry.client_id) {
            return false;
        }
        if q.status_code.is_some() && q.status_code != entry.status_code {
            return false;
        }
        if q.method.as_ref().is_some_and(|m| *m != entry.method) {
            return false;
        }
        if let Some(re) = &self.path_regex {
            if !re.is_match(&entry.path) {
                return false;
            }
        }
        true
    }
}

/// Filter, sort newest first, and cap.
///
/// `entries` must be oldest first; entries sharing a timestamp come out
/// newest first.
pub fn run_query<'a>(
    entries: impl DoubleEndedIterator<Item = &'a AuditEntry>,
    query: &AuditQuery,
    default_limit: usize,
) -> Result<Vec<AuditEntry>, AuditError> {
    let compiled = CompiledQuery::new(query)?;

    let mut matched: Vec<AuditEntry> = entries
        .rev()
        .filter(|e| compiled.matches(e))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
    matched.truncate(query.limit.unwrap_or(default_limit));

    Ok(matched)
}

/// Summary over the entries currently retained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_entries: usize,
    pub last_hour_entries: usize,
    pub abnormal_count: usize,
    pub rate_limited_count: usize,
    pub unique_clients: usize,
    /// Mean over all entries; unfinalized entries count as zero.
    pub avg_duration_ms: f64,
    /// Occurrences per status code; unfinalized entries under `pending`.
    pub status_codes: BTreeMap<String, usize>,
}

pub fn compute_stats<'a>(entries: impl Iterator<Item = &'a AuditEntry>, now_ms: u64) -> AuditStats {
    let mut stats = AuditStats::default();
    let mut clients = HashSet::new();
    let mut duration_sum: u64 = 0;

    for entry in entries {
        stats.total_entries += 1;
        if now_ms.saturating_sub(entry.timestamp_ms) < LAST_HOUR_MS {
            stats.last_hour_entries += 1;
        }
        if entry.abnormal {
            stats.abnormal_count += 1;
        }
        if entry.rate_limited {
            stats.rate_limited_count += 1;
        }
        clients.insert(entry.client_id.as_str());
        duration_sum += entry.duration_ms.unwrap_or(0);

        let key = entry
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| PENDING_STATUS.to_string());
        *stats.status_codes.entry(key).or_insert(0) += 1;
    }

    stats.unique_clients = clients.len();
    if stats.total_entries > 0 {
        stats.avg_duration_ms = duration_sum as f64 / stats.total_entries as f64;
    }
    stats
}
