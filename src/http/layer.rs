//! Tower middleware that feeds every request through the interceptor.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    response::Response,
};
use tower::{Layer, Service};
use uuid::Uuid;

use crate::audit::RequestInterceptor;
use crate::http::request::{request_info, X_REQUEST_ID};

// =============================================================================
// AuditLayer
// =============================================================================

/// Layer that records requests with a shared [`RequestInterceptor`].
///
/// Requests are never rejected here. Over-limit and abnormal requests are
/// flagged in the audit trail and reported through the interceptor's sink.
#[derive(Clone)]
pub struct AuditLayer {
    interceptor: Arc<RequestInterceptor>,
    trust_forwarded_for: bool,
}

impl AuditLayer {
    pub fn new(interceptor: Arc<RequestInterceptor>) -> Self {
        Self {
            interceptor,
            trust_forwarded_for: false,
        }
    }

    /// Take the client identifier from `X-Forwarded-For` when present.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditService {
            inner,
            interceptor: self.interceptor.clone(),
            trust_forwarded_for: self.trust_forwarded_for,
        }
    }
}

// =============================================================================
// AuditService
// =============================================================================

#[derive(Clone)]
pub struct AuditService<S> {
    inner: S,
    interceptor: Arc<RequestInterceptor>,
    trust_forwarded_for: bool,
}

impl<S> Service<Request<Body>> for AuditService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let start = Instant::now();
        let request_id = ensure_request_id(&mut req);
        let info = request_info(&req, self.trust_forwarded_for);
        let entry_ref = self.interceptor.intercept(&info);

        let interceptor = self.interceptor.clone();
        // Use the service that was driven to readiness; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut response = inner.call(req).await?;

            let duration_ms = start.elapsed().as_millis() as u64;
            interceptor.finalize(entry_ref, response.status().as_u16(), duration_ms);

            if let Some(id) = request_id {
                response.headers_mut().entry(X_REQUEST_ID).or_insert(id);
            }
            Ok(response)
        })
    }
}

/// Make sure the request carries an `x-request-id`, returning its value.
fn ensure_request_id(req: &mut Request<Body>) -> Option<HeaderValue> {
    if let Some(existing) = req.headers().get(X_REQUEST_ID) {
        return Some(existing.clone());
    }
    let generated = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
    req.headers_mut().insert(X_REQUEST_ID, generated.clone());
    Some(generated)
}
