use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use filearea_core::{FileAreaError, FileAreas, Result};
use http::Request;
use tokio::net::TcpListener;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub areas: Arc<FileAreas>,
}

impl AppState {
    pub fn new(areas: FileAreas) -> Self {
        Self {
            areas: Arc::new(areas),
        }
    }
}

#[derive(Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// Both the path form (`/pluginfile.php/1/area/0/a.txt`) and the query form
/// (`/pluginfile.php?file=/1/area/0/a.txt`) are routed to the same handler.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/pluginfile.php", get(handlers::pluginfile))
        .route("/pluginfile.php/{*file}", get(handlers::pluginfile))
        .route("/draftfile.php", get(handlers::draftfile))
        .route("/draftfile.php/{*file}", get(handlers::draftfile))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .with_state(state)
}

/// Serves until ctrl-c.
pub async fn run(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("file area server listening on {}", addr);

    axum::serve(listener, build_router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(FileAreaError::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c, serving until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
