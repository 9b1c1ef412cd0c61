#![deny(unused)]
//! Traffic Ops API server.
//!
//! Usage: `traffic_ops [config.json]`. Settings missing from the file (or the
//! whole file) fall back to defaults and may be overridden with `TO__*`
//! environment variables.

use traffic_ops_api::{configure_tracing, default_table, setup_metrics_recorder, ApiServer};
use traffic_ops_core::config::AppConfig;
use traffic_ops_store::open_datastore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let config = AppConfig::load(config_path.as_deref())?;

    configure_tracing(config.logging.json)?;
    if config.auth.is_empty() {
        anyhow::bail!("no users or API tokens configured; set auth.users or auth.api_tokens");
    }
    tracing::info!(
        config = config_path.as_deref().unwrap_or("<defaults>"),
        "Starting Traffic Ops v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(
        users = config.auth.users.len(),
        api_tokens = config.auth.api_tokens.len(),
        "Authentication configured"
    );

    // =========================================================================
    // Storage
    // =========================================================================
    let store = open_datastore(&config.database)?;

    // =========================================================================
    // Routes
    // =========================================================================
    let table = default_table()?;
    for path in table.paths() {
        if let Some(methods) = table.allowed_methods(path) {
            tracing::debug!(path = %path, methods = %methods, "Route registered");
        }
    }

    let metrics_handle = setup_metrics_recorder()?;

    ApiServer::new(config.server, config.auth, table, store)
        .with_metrics(metrics_handle)
        .run()
        .await?;

    Ok(())
}
