use std::net::SocketAddr;

use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use configs::AppConfig;
use service::runtime;
use service::storage::DocumentStore;

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// The application router over an already-built state.
pub fn app(state: AppState) -> Router {
    routes::build_router(state, build_cors())
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bad bind address {}:{}: {e}", cfg.server.host, cfg.server.port)))
}

/// Load configuration, open the data file and serve HTTP until the listener fails.
/// Logging is expected to be initialized by the caller.
pub async fn run() -> Result<(), StartupError> {
    let cfg = AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;

    runtime::ensure_env(&cfg).await?;

    let store = DocumentStore::from_config(&cfg.store).map_err(|e| StartupError::Runtime(e.to_string()))?;
    info!(data_file = %store.path().display(), env = ?cfg.app.env, "document store ready");

    let addr = bind_addr(&cfg)?;
    let state = AppState::new(store, cfg);
    let app = app(state);

    info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| StartupError::Runtime(e.to_string()))?;
    axum::serve(listener, app).await.map_err(|e| StartupError::Runtime(e.to_string()))?;
    Ok(())
}
