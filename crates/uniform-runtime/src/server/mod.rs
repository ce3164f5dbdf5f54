//! Action server: the wire contract over axum.

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header::CONTENT_TYPE, Method};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::workflow::ApprovalWorkflow;

pub mod handlers;

pub use handlers::ApiError;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
        }
    }
}

pub fn build_router(workflow: Arc<ApprovalWorkflow>, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route(
            "/",
            get(handlers::handle_query).post(handlers::handle_action),
        )
        .route(
            "/exec",
            get(handlers::handle_query).post(handlers::handle_action),
        )
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(workflow)
}

/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "portal server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
