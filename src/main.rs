use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use touch_soccer_server::build_app;
use touch_soccer_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let (app, _state) = build_app(&config);

    let bind_address = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(address = %bind_address, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!("Touch soccer server listening on http://{}", bind_address);
    info!("WebSocket endpoint: ws://{}/ws", bind_address);
    info!(
        mode = ?config.mode,
        tick_rate_hz = config.tick_rate_hz,
        "CORS configured for: {}",
        config.client_origin
    );

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
