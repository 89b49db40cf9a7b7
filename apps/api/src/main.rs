use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use screener_api::config::Config;
use screener_api::db::create_pool;
use screener_api::relay::Relay;
use screener_api::routes::build_router;
use screener_api::sessions::postgres::PgSessionRepository;
use screener_api::sessions::{MemorySessionRepository, SessionRepository, SessionService};
use screener_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("screener_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Session persistence: PostgreSQL when configured, process memory otherwise
    let repo: Arc<dyn SessionRepository> = match &config.database_url {
        Some(url) => Arc::new(PgSessionRepository::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; sessions are kept in memory and lost on restart");
            Arc::new(MemorySessionRepository::new())
        }
    };

    // Relay to the LLM provider
    let relay = Relay::new(config.provider_endpoint(), config.request_timeout)?;
    if relay.is_configured() {
        info!("Relay configured (model: {})", config.provider_model);
    } else {
        warn!("API_KEY not set; /api/proxy will answer 500");
    }

    let state = AppState {
        sessions: SessionService::new(repo),
        relay,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
