mod state;
mod ws;

use axum::routing::get;
use axum::Router;
use lobby_core::config::ServerConfig;
use state::AppState;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ws::websocket_handler;

#[tokio::main]
/// Initializes tracing, spawns the stale-game watchdog, then serves the
/// websocket endpoint and static client assets. Listens on port 8080.
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .init();

    let config = ServerConfig::from_env();
    let app_state = AppState::new(config.clone());

    let watchdog_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(watchdog_state.config.stale_sweep_interval);
        loop {
            interval.tick().await;
            let now = watchdog_state.now_ms();
            watchdog_state.lifecycle.sweep_stale(&watchdog_state.timers, now);
        }
    });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(app_state)
        .fallback_service(ServeDir::new(".").not_found_service(ServeFile::new("index.html")));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
    tracing::info!("listening on 0.0.0.0:8080");
    axum::serve(listener, app).await.unwrap();
}
