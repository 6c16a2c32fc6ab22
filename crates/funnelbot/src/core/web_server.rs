//! HTTP routes served next to the bot
//!
//! - `/`        - plain liveness text
//! - `/health`  - JSON health check with uptime
//! - `/metrics` - Prometheus metrics in text format
//!
//! In webhook mode these routes are merged into the router that receives
//! Telegram updates, so one port serves everything. In polling mode they are
//! served on their own by [`start_web_server`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::core::error::AppResult;

#[derive(Clone)]
struct AppState {
    start_time: Instant,
}

/// Builds the liveness, health and metrics routes
pub fn routes() -> Router {
    let state = AppState {
        start_time: Instant::now(),
    };

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::new(state))
}

/// Serves [`routes`] on its own listener (polling mode)
pub async fn start_web_server(port: u16) -> AppResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    log::info!("Starting web server on http://{}", addr);
    log::info!("  /        - Liveness");
    log::info!("  /health  - Health check");
    log::info!("  /metrics - Prometheus metrics");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, routes()).await?;

    Ok(())
}

async fn root_handler() -> &'static str {
    "Bot is running!"
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health_status = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "service": "funnelbot",
        "version": env!("CARGO_PKG_VERSION"),
    });

    (StatusCode::OK, axum::Json(health_status))
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        ),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain".to_string())],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_root_reports_running() {
        assert_eq!(root_handler().await, "Bot is running!");
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let state = Arc::new(AppState {
            start_time: Instant::now(),
        });
        let response = health_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_exposes_funnel_counters() {
        crate::core::metrics::init_metrics();
        let response = metrics_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("funnelbot_events_total"));
    }
}
