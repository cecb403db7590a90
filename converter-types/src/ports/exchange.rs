//! Exchange rate provider port.
//!
//! The trait lives next to the currency whitelist in `exchange-rates`, which
//! also ships the HTTP and fixed-rate adapters.

pub use exchange_rates::{RateProvider, RateProviderError, RateTable};
