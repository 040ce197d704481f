mod page;
mod routes;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use stickerdb_config::AppConfig;
use stickerdb_storage::StickerLibrary;
use stickerdb_sync::{run_startup_sync, GithubRemote, SyncConfig};
use tokio::signal;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

use routes::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let app_config = AppConfig::from_env()?;
    info!(?app_config, "loaded configuration");

    // Sync finishes (or gives up) before the listener is bound.
    if app_config.sync_on_startup {
        startup_sync(&app_config).await;
    } else {
        info!("startup sync disabled, serving local state only");
    }

    let library = StickerLibrary::from_app_config(&app_config);
    let app = build_router(AppState::new(library, &app_config.public_base_url));

    let addr: SocketAddr = app_config
        .api_addr
        .parse()
        .with_context(|| format!("invalid STICKERDB_API_ADDR {}", app_config.api_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "starting api server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stickerdb_sync=debug"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

async fn startup_sync(app_config: &AppConfig) {
    let remote = match GithubRemote::from_remote_config(&app_config.remote) {
        Ok(remote) => remote,
        Err(err) => {
            warn!("cannot build remote client, skipping sync: {err:#}");
            return;
        }
    };

    let report = run_startup_sync(&SyncConfig::from_app_config(app_config), &remote).await;
    debug!(?report, "startup sync report");
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("received ctrl-c, shutting down");
}
