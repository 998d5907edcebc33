//! REST API module using Axum
//!
//! Read-only HTTP endpoints over the gateway status and the record store.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::DashboardState;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Create the complete application router.
pub fn create_app(state: DashboardState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state))
        .merge(routes::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: DashboardState,
    shutdown: tokio_util::sync::CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("🌐 Read API listening on http://{}", addr);
    }
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
