//! Server-authoritative two-team touch soccer.
//!
//! The match runs on a single scheduler task at a fixed tick rate; WebSocket
//! clients send kicks and selections and receive a full snapshot every tick.

pub mod commands;
pub mod components;
pub mod config;
pub mod error;
pub mod physics;
pub mod scheduler;
pub mod simulation;
pub mod wire_format;
pub mod ws;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use config::ServerConfig;
use scheduler::{MatchHandle, MatchStatus};

#[derive(Clone)]
pub struct AppState {
    pub matches: MatchHandle,
    pub outbound_buffer: usize,
}

/// Spawn the match scheduler and build the router. Must be called inside a
/// tokio runtime.
pub fn build_app(config: &ServerConfig) -> (Router, AppState) {
    let (matches, _scheduler) = scheduler::spawn_match(config);
    let state = AppState {
        matches,
        outbound_buffer: config.outbound_buffer,
    };

    let app = Router::new()
        .route("/", get(|| async { "Touch Soccer Server" }))
        .route("/ws", get(ws::websocket_handler))
        .route("/status", get(match_status))
        .layer(cors_layer(&config.client_origin))
        .with_state(state.clone());

    (app, state)
}

async fn match_status(State(state): State<AppState>) -> Result<Json<MatchStatus>, StatusCode> {
    state
        .matches
        .status()
        .await
        .map(Json)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

fn cors_layer(client_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match client_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(origin = client_origin, error = %e, "Invalid client origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}
