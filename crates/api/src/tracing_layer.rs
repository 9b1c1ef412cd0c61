//! Log subscriber configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use traffic_ops_core::{Error, Result};

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn configure_tracing(json: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,traffic_ops=debug".into()),
    );

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    installed.map_err(|e| Error::internal(format!("Failed to install tracing subscriber: {}", e)))
}
