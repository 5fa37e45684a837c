use std::sync::Arc;

use tracing::info;
use watchboard::{
    build_app,
    config::Config,
    logging,
    registry::{store::JsonFileStore, Registry},
    systemd_client::{ensure_systemd_available, DbusSystemdClient},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    ensure_systemd_available().await?;

    let provider = Arc::new(DbusSystemdClient::new());
    let store = Arc::new(JsonFileStore::new(&config.watchlist_dir));
    let registry = Arc::new(Registry::new(provider, store));
    let bind_socket = config.bind_socket()?;
    let state = AppState::new(registry);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        watchlist_dir = %config.watchlist_dir.display(),
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
