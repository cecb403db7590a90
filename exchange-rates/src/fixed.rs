//! Deterministic provider for development and testing.
//!
//! Cross rates are derived from each currency's reference USD value, so
//! `rate(A -> B) = usd(A) / usd(B)`.

use crate::{CurrencyCode, RateProvider, RateProviderError, RateTable};

#[derive(Debug, Default, Clone, Copy)]
pub struct FixedRateProvider;

impl FixedRateProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn rates_for(&self, base: CurrencyCode) -> RateTable {
        let base_usd = base.reference_usd_value();
        RateTable::new(
            base,
            base.peers()
                .into_iter()
                .map(|peer| (peer, base_usd / peer.reference_usd_value())),
        )
    }
}

#[async_trait::async_trait]
impl RateProvider for FixedRateProvider {
    async fn fetch_rates(&self, base: CurrencyCode) -> Result<RateTable, RateProviderError> {
        Ok(self.rates_for(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_rates_cover_all_peers() {
        let table = FixedRateProvider::new().rates_for(CurrencyCode::EUR);
        assert_eq!(table.len(), 3);
        assert!(table.get(CurrencyCode::EUR).is_none());
    }

    #[test]
    fn test_fixed_usd_to_eur() {
        let table = FixedRateProvider::new().rates_for(CurrencyCode::USD);
        // 1 / 1.087
        assert_eq!(table.get(CurrencyCode::EUR).unwrap().to_string(), "0.919963");
    }

    #[test]
    fn test_fixed_gbp_to_usd() {
        let table = FixedRateProvider::new().rates_for(CurrencyCode::GBP);
        assert_eq!(table.get(CurrencyCode::USD).unwrap().to_string(), "1.266000");
    }
}
