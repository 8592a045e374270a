use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use talent_crm::config::Config;
use talent_crm::routes::build_router;
use talent_crm::service::CandidateService;
use talent_crm::state::AppState;
use talent_crm::store::open_store;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    talent_crm::init_tracing(&config.rust_log);

    info!("Starting Talent CRM v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Default scores {}..={}, status '{}', skill '{}'",
        config.policy.score_min,
        config.policy.score_max,
        config.policy.default_status,
        config.policy.placeholder_skill
    );

    let store = open_store(&config).await?;
    let service = Arc::new(CandidateService::from_config(store, &config)?);

    let state = AppState {
        service,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // no auth; dashboard is served from another origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
