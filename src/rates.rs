//! Financial rate data provider
//!
//! Mortgage and interest rate quotes behind a TTL cache. The default source
//! serves static figures; an HTTP source can be configured instead. A failed
//! refresh never reaches the caller: the last good list is served, or the
//! static defaults when nothing was ever fetched.

use crate::error::QueryServiceError;
use crate::models::RateQuote;
use crate::Result;
use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Default cache lifetime for rate lists
pub const DEFAULT_RATE_TTL: Duration = Duration::from_secs(3600);

const DEFAULT_MORTGAGE_RATES: &[(&str, f64, f64)] = &[
    ("30-year fixed", 6.85, 6.87),
    ("15-year fixed", 6.15, 6.18),
    ("5/1 ARM", 6.43, 7.95),
];

const DEFAULT_INTEREST_RATES: &[(&str, f64)] = &[
    ("Federal Funds Rate", 5.33),
    ("Prime Rate", 8.50),
    ("10-Year Treasury", 4.25),
];

fn today() -> String {
    Local::now().format("%m/%d/%Y").to_string()
}

pub fn default_mortgage_rates() -> Vec<RateQuote> {
    let as_of = today();
    DEFAULT_MORTGAGE_RATES
        .iter()
        .map(|(category, rate, apr)| RateQuote {
            category: category.to_string(),
            rate: *rate,
            apr: Some(*apr),
            as_of: as_of.clone(),
        })
        .collect()
}

pub fn default_interest_rates() -> Vec<RateQuote> {
    let as_of = today();
    DEFAULT_INTEREST_RATES
        .iter()
        .map(|(category, rate)| RateQuote {
            category: category.to_string(),
            rate: *rate,
            apr: None,
            as_of: as_of.clone(),
        })
        .collect()
}

/// Trait for anything that can produce fresh rate quotes
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_mortgage_rates(&self) -> Result<Vec<RateQuote>>;
    async fn fetch_interest_rates(&self) -> Result<Vec<RateQuote>>;
}

/// Placeholder figures, stamped with today's date
pub struct StaticRateSource;

#[async_trait]
impl RateSource for StaticRateSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_mortgage_rates(&self) -> Result<Vec<RateQuote>> {
        Ok(default_mortgage_rates())
    }

    async fn fetch_interest_rates(&self) -> Result<Vec<RateQuote>> {
        Ok(default_interest_rates())
    }
}

/// Fetches `RateQuote` arrays from `{base_url}/mortgage` and
/// `{base_url}/interest`.
#[derive(Clone)]
pub struct HttpRateSource {
    client: Client,
    base_url: String,
}

impl HttpRateSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_quotes(&self, path: &str) -> Result<Vec<RateQuote>> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.client.get(&url).send().await.map_err(|e| {
            QueryServiceError::RateSourceError(format!("Rate request failed for {}: {}", url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryServiceError::RateSourceError(format!(
                "Rate source returned {} for {}",
                status, url
            )));
        }

        let quotes = response.json::<Vec<RateQuote>>().await.map_err(|e| {
            QueryServiceError::RateSourceError(format!("Invalid rate payload from {}: {}", url, e))
        })?;

        if quotes.is_empty() {
            return Err(QueryServiceError::RateSourceError(format!(
                "Rate source returned no quotes for {}",
                url
            )));
        }

        Ok(quotes)
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_mortgage_rates(&self) -> Result<Vec<RateQuote>> {
        self.get_quotes("/mortgage").await
    }

    async fn fetch_interest_rates(&self) -> Result<Vec<RateQuote>> {
        self.get_quotes("/interest").await
    }
}

struct CachedRates {
    quotes: Vec<RateQuote>,
    fetched_at: Instant,
}

#[derive(Clone, Copy, Debug)]
enum RateKind {
    Mortgage,
    Interest,
}

/// TTL-cached access to mortgage and interest rates
pub struct FinancialDataService {
    source: Box<dyn RateSource>,
    ttl: Duration,
    mortgage: RwLock<Option<CachedRates>>,
    interest: RwLock<Option<CachedRates>>,
}

impl FinancialDataService {
    pub fn new(source: Box<dyn RateSource>, ttl: Duration) -> Self {
        info!(source = source.name(), ttl_secs = ttl.as_secs(), "Financial data service ready");
        Self {
            source,
            ttl,
            mortgage: RwLock::new(None),
            interest: RwLock::new(None),
        }
    }

    pub async fn get_mortgage_rates(&self) -> Vec<RateQuote> {
        self.get_rates(RateKind::Mortgage).await
    }

    pub async fn get_interest_rates(&self) -> Vec<RateQuote> {
        self.get_rates(RateKind::Interest).await
    }

    async fn get_rates(&self, kind: RateKind) -> Vec<RateQuote> {
        let cache = match kind {
            RateKind::Mortgage => &self.mortgage,
            RateKind::Interest => &self.interest,
        };

        {
            let cached = cache.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    debug!(?kind, "Serving rates from cache");
                    return entry.quotes.clone();
                }
            }
        }

        let mut cached = cache.write().await;

        // Another request may have refreshed while we waited for the lock.
        if let Some(entry) = cached.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                return entry.quotes.clone();
            }
        }

        let fetched = match kind {
            RateKind::Mortgage => self.source.fetch_mortgage_rates().await,
            RateKind::Interest => self.source.fetch_interest_rates().await,
        };

        match fetched {
            Ok(quotes) => {
                debug!(?kind, count = quotes.len(), "Refreshed rates");
                *cached = Some(CachedRates {
                    quotes: quotes.clone(),
                    fetched_at: Instant::now(),
                });
                quotes
            }
            Err(error) => match cached.as_ref() {
                Some(stale) => {
                    warn!(?kind, %error, "Rate refresh failed, serving stale cache");
                    stale.quotes.clone()
                }
                None => {
                    warn!(?kind, %error, "Rate refresh failed, serving default rates");
                    match kind {
                        RateKind::Mortgage => default_mortgage_rates(),
                        RateKind::Interest => default_interest_rates(),
                    }
                }
            },
        }
    }
}

impl Default for FinancialDataService {
    fn default() -> Self {
        Self::new(Box::new(StaticRateSource), DEFAULT_RATE_TTL)
    }
}
