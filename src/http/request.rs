//! Request descriptor extraction.
//!
//! # Responsibilities
//! - Work out the client identifier (peer address or trusted forwarded hop)
//! - Copy the headers the interceptor reads
//! - Pick up the session snapshot left by upstream auth
//!
//! # Design Decisions
//! - `X-Forwarded-For` is ignored unless explicitly trusted
//! - Non-UTF-8 header values are treated as absent

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderName, Request};

use crate::audit::{RequestInfo, SessionSnapshot};

/// Header carrying the request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Client identifier used when nothing better is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Build the interceptor's view of `request`.
pub fn request_info<B>(request: &Request<B>, trust_forwarded_for: bool) -> RequestInfo {
    let headers = request.headers();

    RequestInfo {
        client_id: client_id(request, trust_forwarded_for),
        method: request.method().as_str().to_string(),
        path: request.uri().path().to_string(),
        user_agent: header_str(headers, &header::USER_AGENT),
        referer: header_str(headers, &header::REFERER),
        content_type: header_str(headers, &header::CONTENT_TYPE),
        authorization: header_str(headers, &header::AUTHORIZATION),
        content_length: header_str(headers, &header::CONTENT_LENGTH),
        session: request.extensions().get::<SessionSnapshot>().cloned(),
        request_id: headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

/// First forwarded hop when trusted, else the socket peer, else `unknown`.
pub fn client_id<B>(request: &Request<B>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
