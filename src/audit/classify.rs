//! Request classification and fingerprinting.
//!
//! Pattern checks are plain substring searches. They flag likely probes
//! (traversal, injection, XSS, null bytes, bots); they do not sanitize
//! anything and never reject a request.

use std::fmt;

use serde::{Deserialize, Serialize};

const TRAVERSAL: &[&str] = &["../", "..%2f", "..%5c"];
const SQL_INJECTION: &[&str] = &["'", "--", "/*", "xp_"];
const XSS: &[&str] = &["<script", "javascript:", "onerror=", "onclick="];
const NULL_BYTE: &[&str] = &["\0", "%00"];
const BOT_AGENTS: &[&str] = &["bot", "crawler", "spider", "scraper"];

/// Which family of pattern flagged a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbnormalKind {
    PathTraversal,
    SqlInjection,
    Xss,
    NullByte,
    BotUserAgent,
}

impl AbnormalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbnormalKind::PathTraversal => "path_traversal",
            AbnormalKind::SqlInjection => "sql_injection",
            AbnormalKind::Xss => "xss",
            AbnormalKind::NullByte => "null_byte",
            AbnormalKind::BotUserAgent => "bot_user_agent",
        }
    }
}

impl fmt::Display for AbnormalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First matching pattern family, checked in a fixed order.
///
/// The method does not influence the result; it is accepted so callers can
/// pass the full request line.
pub fn classify(path: &str, _method: &str, user_agent: &str) -> Option<AbnormalKind> {
    let contains_any = |patterns: &[&str]| patterns.iter().any(|p| path.contains(p));

    if contains_any(TRAVERSAL) {
        return Some(AbnormalKind::PathTraversal);
    }
    if contains_any(SQL_INJECTION) {
        return Some(AbnormalKind::SqlInjection);
    }
    if contains_any(XSS) {
        return Some(AbnormalKind::Xss);
    }
    if contains_any(NULL_BYTE) {
        return Some(AbnormalKind::NullByte);
    }

    let agent = user_agent.to_lowercase();
    if BOT_AGENTS.iter().any(|p| agent.contains(p)) {
        return Some(AbnormalKind::BotUserAgent);
    }

    None
}

/// Whether the request matches any probe pattern.
pub fn is_abnormal(path: &str, method: &str, user_agent: &str) -> bool {
    classify(path, method, user_agent).is_some()
}

/// Correlation key over client, method, path and whether an
/// `Authorization` header was sent.
///
/// Each text field is length-prefixed so separators inside a value cannot
/// shift field boundaries. Only the presence of the header is encoded; its
/// value never reaches the key.
pub fn fingerprint(client_id: &str, method: &str, path: &str, authorization: Option<&str>) -> String {
    let auth = if authorization.is_some() { "auth" } else { "anon" };
    format!(
        "{}:{}|{}:{}|{}:{}|{}",
        client_id.len(),
        client_id,
        method.len(),
        method,
        path.len(),
        path,
        auth
    )
}
