pub mod candidates;
pub mod config;
pub mod db;
pub mod errors;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes structured logging for a binary. `RUST_LOG` wins when it
/// parses as a filter; otherwise the crate logs at `default_level`.
pub fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "talent_crm={default_level},talent_import={default_level},tower_http={default_level}"
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
