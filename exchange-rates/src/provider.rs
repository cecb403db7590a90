//! Rate provider port and the rate table it produces.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::{ApiLayerProvider, CurrencyCode, FixedRateProvider};

/// Error type for rate provider operations.
///
/// Every variant means the same thing to callers: rates are unavailable and
/// the surrounding operation must fail.
#[derive(Debug, thiserror::Error)]
pub enum RateProviderError {
    #[error("Rate provider request failed: {0}")]
    Transport(String),

    #[error("Rate provider returned HTTP {0}")]
    Status(u16),

    #[error("Rate provider response could not be decoded: {0}")]
    Decode(String),

    #[error("Rate provider returned no rates for {0}")]
    Empty(CurrencyCode),
}

/// Peer rates relative to one base currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    base: CurrencyCode,
    rates: BTreeMap<CurrencyCode, Decimal>,
}

impl RateTable {
    /// Builds a table, dropping the base itself and normalizing every value.
    pub fn new(base: CurrencyCode, rates: impl IntoIterator<Item = (CurrencyCode, Decimal)>) -> Self {
        let rates = rates
            .into_iter()
            .filter(|(code, _)| *code != base)
            .map(|(code, rate)| (code, crate::normalize_rate(rate)))
            .collect();
        Self { base, rates }
    }

    pub fn base(&self) -> CurrencyCode {
        self.base
    }

    pub fn get(&self, code: CurrencyCode) -> Option<Decimal> {
        self.rates.get(&code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CurrencyCode, Decimal)> + '_ {
        self.rates.iter().map(|(code, rate)| (*code, *rate))
    }
}

/// Port trait for exchange rate providers.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync + 'static {
    /// Fetches the rate of every peer of `base`, expressed as units of the
    /// peer per one unit of `base`.
    async fn fetch_rates(&self, base: CurrencyCode) -> Result<RateTable, RateProviderError>;
}

/// Provider selected at startup from configuration.
pub enum AnyRateProvider {
    ApiLayer(ApiLayerProvider),
    Fixed(FixedRateProvider),
}

#[async_trait::async_trait]
impl RateProvider for AnyRateProvider {
    async fn fetch_rates(&self, base: CurrencyCode) -> Result<RateTable, RateProviderError> {
        match self {
            AnyRateProvider::ApiLayer(p) => p.fetch_rates(base).await,
            AnyRateProvider::Fixed(p) => p.fetch_rates(base).await,
        }
    }
}
