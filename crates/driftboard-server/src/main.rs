use driftboard_room::RoomsManager;
use driftboard_server::{build_router, AppState, ServerConfig};
use driftboard_store::Store;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let store = Store::new(config.data_dir.clone());
    let rooms = RoomsManager::new(store);
    let state = AppState::new(rooms);
    let app = build_router(state);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {}: {err}", config.listen_addr));
    info!(listen_addr = %config.listen_addr, data_dir = %config.data_dir.display(), "driftboard-server ready");

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!(%err, "server error");
    }
}
