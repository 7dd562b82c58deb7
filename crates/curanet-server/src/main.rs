use anyhow::{Context, Result};
use curanet_core::open_portal;
use curanet_server::{app, init_tracing, AppState, Settings};
use tokio::{net::TcpListener, signal};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings.logging.level);

    let portal = open_portal(&settings.database.path, &settings.portal_settings())
        .with_context(|| format!("failed to open database {}", settings.database.path.display()))?;

    let addr = settings.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, database = %settings.database.path.display(), "curanet server listening");

    axum::serve(listener, app(AppState::new(portal)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("curanet server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}
