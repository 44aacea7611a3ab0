use attendance_tracker::{
    AppState, Config, JsonFileStore, Reconciler, preferences::Preferences, router,
    session::{IdentityProvider, LocalIdentityProvider, spawn_identity_listener},
};
use std::{path::Path, sync::Arc};
use tokio::fs;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    ensure_parent(&config.data_path).await?;
    ensure_parent(&config.prefs_path).await?;

    let store = JsonFileStore::open(&config.data_path).await?;
    let tracker = Arc::new(Reconciler::new(Arc::new(store)));
    let identity = Arc::new(LocalIdentityProvider::new());
    let listener_task = spawn_identity_listener(identity.subscribe(), tracker.clone());

    let preferences = Preferences::load(&config.prefs_path).await;
    let state = AppState::new(tracker, identity, preferences);
    let app = router(state);

    let addr = config.addr();
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    listener_task.abort();
    info!("shut down");
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<(), std::io::Error> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
