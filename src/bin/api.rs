use rent_roll_query::{
    api::{start_server, ApiState},
    config::ServiceConfig,
    rates::{FinancialDataService, HttpRateSource, RateSource, StaticRateSource},
    router::QueryRouter,
    store::{RentRollStore, SqliteRentRollStore},
    tools::create_default_registry,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServiceConfig::from_env()?;

    info!("Rent Roll Query Service - API Server");
    info!("Port: {}", config.port);
    info!("Database: {}", config.database_url);

    // Create components
    let store = SqliteRentRollStore::connect(&config.database_url, config.raw_query_max_rows).await?;
    let units = store.unit_count().await?;
    info!(units, "Rent roll store ready");

    let source: Box<dyn RateSource> = match config.financial_rates_url.as_deref() {
        Some(url) => {
            info!(url, "Using live rate source");
            Box::new(HttpRateSource::new(url)?)
        }
        None => Box::new(StaticRateSource),
    };
    let rates = Arc::new(FinancialDataService::new(source, config.rate_cache_ttl));

    let store: Arc<dyn RentRollStore> = Arc::new(store);
    let registry = create_default_registry(store.clone(), rates)?;
    let router = QueryRouter::new(Arc::new(registry));

    info!("Starting API server...");

    start_server(ApiState { router, store }, config.port).await?;

    Ok(())
}
