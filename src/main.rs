use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use tagfolio_backend::app;
use tagfolio_backend::config::{AppConfig, ProviderKind};
use tagfolio_backend::db::{MemoryStore, PgStore, PortfolioStore};
use tagfolio_backend::external::multi_provider::MultiProvider;
use tagfolio_backend::external::price_provider::PriceProvider;
use tagfolio_backend::external::twelvedata::TwelveDataProvider;
use tagfolio_backend::external::yahoo::YahooProvider;
use tagfolio_backend::logging::{init_logging, LoggingConfig};
use tagfolio_backend::services::price_service::PriceService;
use tagfolio_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env()?)?;

    let config = AppConfig::from_env()?;

    let store: Arc<dyn PortfolioStore> = match &config.database_url {
        Some(url) => Arc::new(
            PgStore::connect(url, config.db_max_connections)
                .await
                .context("Failed to connect to DATABASE_URL")?,
        ),
        None => {
            warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    let provider = build_provider(config.price_provider)?;
    info!("📊 Using price provider: {}", provider.name());

    let state = AppState {
        store,
        prices: PriceService::new(provider, config.quote_cache_ttl, config.price_fetch_timeout),
    };
    let app = app::create_app(state).layer(app::cors_layer(&config.cors_allow_origin)?);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🚀 Tagfolio backend running at http://{}/", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn build_provider(kind: ProviderKind) -> anyhow::Result<Arc<dyn PriceProvider>> {
    let provider: Arc<dyn PriceProvider> = match kind {
        ProviderKind::Yahoo => Arc::new(YahooProvider::new()),
        ProviderKind::TwelveData => Arc::new(
            TwelveDataProvider::from_env()
                .map_err(|e| anyhow::anyhow!("Failed to create TwelveDataProvider (check TWELVEDATA_API_KEY): {}", e))?,
        ),
        ProviderKind::Multi => {
            let primary = Box::new(
                TwelveDataProvider::from_env()
                    .map_err(|e| anyhow::anyhow!("Failed to create TwelveDataProvider (check TWELVEDATA_API_KEY): {}", e))?,
            );
            Arc::new(MultiProvider::new(primary, Box::new(YahooProvider::new())))
        }
    };
    Ok(provider)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
