//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router (admin API + application routes)
//! - Wire up middleware (audit, timeout, tracing)
//! - Bind server to listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::audit::{AuditError, RequestInterceptor};
use crate::config::AuditConfig;
use crate::http::layer::AuditLayer;

/// Shared state handed to handlers.
#[derive(Clone)]
pub struct AppState {
    pub interceptor: Arc<RequestInterceptor>,
    pub config: Arc<AuditConfig>,
}

/// HTTP server hosting the audit interceptor.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Build a server with a fresh interceptor and the default application routes.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        let interceptor = Arc::new(RequestInterceptor::from_config(&config)?);
        Ok(Self::with_app(config, interceptor, default_app()))
    }

    /// Build a server around an existing interceptor and application router.
    pub fn with_app(config: AuditConfig, interceptor: Arc<RequestInterceptor>, app: Router) -> Self {
        let state = AppState {
            interceptor,
            config: Arc::new(config),
        };
        let router = Self::build_router(&state, app);
        Self { router, state }
    }

    /// Layer order, outermost first: trace, audit, timeout, routes.
    /// Audit sits outside the timeout so timed-out requests are still finalized.
    #[allow(deprecated)]
    fn build_router(state: &AppState, app: Router) -> Router {
        let mut router = app;
        if state.config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(
                state.config.server.request_timeout_secs,
            )))
            .layer(
                AuditLayer::new(state.interceptor.clone())
                    .trust_forwarded_for(state.config.server.trust_forwarded_for),
            )
            .layer(TraceLayer::new_for_http())
    }

    /// The router with all layers applied, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn interceptor(&self) -> Arc<RequestInterceptor> {
        self.state.interceptor.clone()
    }

    pub fn config(&self) -> &AuditConfig {
        &self.state.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Application stand-in: liveness probe plus a 404 fallback.
fn default_app() -> Router {
    Router::new()
        .route("/health", axum::routing::get(|| async { "ok" }))
        .fallback(not_found)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
