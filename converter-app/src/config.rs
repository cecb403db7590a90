//! Configuration loading from environment.

use std::env;
use std::time::Duration;

use exchange_rates::apilayer::DEFAULT_BASE_URL;

/// Which upstream the service takes exchange rates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatesSource {
    /// apilayer `exchangerates_data`, needs an API key.
    ApiLayer { api_url: String, api_key: String },
    /// Deterministic built-in rates for development.
    Fixed,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub rates: RatesSource,
    pub rates_timeout: Duration,
    pub rate_limit_per_minute: u32,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = var("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()?;

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let rates = match var("RATES_PROVIDER").as_deref().unwrap_or("apilayer") {
            "apilayer" => RatesSource::ApiLayer {
                api_url: var("RATES_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                api_key: var("RATES_API_KEY").ok_or_else(|| {
                    anyhow::anyhow!("RATES_API_KEY is required when RATES_PROVIDER=apilayer")
                })?,
            },
            "fixed" => RatesSource::Fixed,
            other => anyhow::bail!("Unknown RATES_PROVIDER: {} (expected apilayer or fixed)", other),
        };

        let rates_timeout = Duration::from_secs(
            var("RATES_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()?,
        );

        let rate_limit_per_minute = var("RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|| "100".to_string())
            .parse()?;

        let otlp_endpoint = var("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.is_empty());

        Ok(Self {
            port,
            database_url,
            rates,
            rates_timeout,
            rate_limit_per_minute,
            otlp_endpoint,
        })
    }
}
