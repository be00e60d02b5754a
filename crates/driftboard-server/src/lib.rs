//! Session Dispatcher and websocket transport.

pub mod config;
pub mod dispatcher;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod ws;

use axum::routing::get;
use axum::Router;

pub use config::ServerConfig;
pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
