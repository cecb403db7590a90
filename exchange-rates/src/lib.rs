//! Supported Currencies and Exchange Rate Providers
//!
//! The set of currencies the converter service accepts is fixed at compile time.
//! Currencies are defined declaratively using a macro that generates the
//! `CurrencyCode` enum and its lookup helpers, so the whitelist cannot be
//! mutated at runtime.
//!
//! # Adding a New Currency
//! Add a line to the `define_currencies!` macro invocation:
//! ```ignore
//! define_currencies! {
//!     // ... existing currencies ...
//!     JPY => ("JPY", "¥", "Japanese Yen", 6_700),
//! }
//! ```
//!
//! The last field is the reference value of one unit in micro-USD. It is only
//! used by [`FixedRateProvider`] to produce deterministic development rates.
//!
//! # Example
//! ```
//! use exchange_rates::CurrencyCode;
//!
//! let usd: CurrencyCode = "usd".parse().unwrap();
//! assert_eq!(usd, CurrencyCode::USD);
//! assert_eq!(usd.peers().len(), 3);
//! ```

use rust_decimal::Decimal;

pub mod apilayer;
pub mod fixed;
mod provider;

pub use apilayer::ApiLayerProvider;
pub use fixed::FixedRateProvider;
pub use provider::{AnyRateProvider, RateProvider, RateProviderError, RateTable};

/// Number of decimal places every stored rate carries.
pub const RATE_SCALE: u32 = 6;

/// Rounds a rate to [`RATE_SCALE`] places (banker's rounding) and pads it so
/// that it always renders with exactly that many decimals.
pub fn normalize_rate(rate: Decimal) -> Decimal {
    let mut rate = rate.round_dp(RATE_SCALE);
    rate.rescale(RATE_SCALE);
    rate
}

// ─────────────────────────────────────────────────────────────────────────────
// THE MACRO: Defines the whitelist enum and its runtime lookups
// ─────────────────────────────────────────────────────────────────────────────

/// Macro to define the supported currencies.
///
/// # Syntax
/// ```ignore
/// define_currencies! {
///     Variant => ("CODE", "SYMBOL", "display name", micro_usd_per_unit),
/// }
/// ```
#[macro_export]
macro_rules! define_currencies {
    (
        $(
            $name:ident => ($code:literal, $symbol:literal, $display:literal, $micro_usd:expr)
        ),* $(,)?
    ) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize, utoipa::ToSchema,
        )]
        #[serde(rename_all = "UPPERCASE")]
        pub enum CurrencyCode {
            $($name),*
        }

        impl CurrencyCode {
            pub fn code(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $code),*
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $symbol),*
                }
            }

            pub fn display_name(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $display),*
                }
            }

            /// Reference value of one unit, in USD.
            pub fn reference_usd_value(&self) -> rust_decimal::Decimal {
                match self {
                    $(CurrencyCode::$name => rust_decimal::Decimal::new($micro_usd, 6)),*
                }
            }

            /// Every supported currency, in declaration order.
            pub fn all() -> &'static [CurrencyCode] {
                &[$(CurrencyCode::$name),*]
            }

            /// Looks a code up case-insensitively. Surrounding whitespace is not trimmed.
            pub fn lookup(s: &str) -> Option<CurrencyCode> {
                match s.to_uppercase().as_str() {
                    $($code => Some(CurrencyCode::$name),)*
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for CurrencyCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.code())
            }
        }

        impl std::str::FromStr for CurrencyCode {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                CurrencyCode::lookup(s).ok_or_else(|| format!("Unknown currency: {}", s))
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// CURRENCY DEFINITIONS
// ─────────────────────────────────────────────────────────────────────────────

define_currencies! {
    GBP => ("GBP", "£", "Pound Sterling", 1_266_000),
    USD => ("USD", "$", "US Dollar", 1_000_000),
    EUR => ("EUR", "€", "Euro", 1_087_000),
    CNY => ("CNY", "¥", "Chinese Yuan", 138_500),
}

impl CurrencyCode {
    /// The peer set of a base currency: every supported currency except itself.
    pub fn peers(&self) -> Vec<CurrencyCode> {
        CurrencyCode::all()
            .iter()
            .copied()
            .filter(|c| c != self)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!("eur".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert_eq!("cNy".parse::<CurrencyCode>().unwrap(), CurrencyCode::CNY);
    }

    #[test]
    fn test_unsupported_codes_are_rejected() {
        for code in ["AMD", "INR", "JPY", "", "US", "USDD", " USD"] {
            assert!(CurrencyCode::lookup(code).is_none(), "{code} should be rejected");
        }
    }

    #[test]
    fn test_currency_code_display() {
        assert_eq!(CurrencyCode::USD.to_string(), "USD");
        assert_eq!(CurrencyCode::GBP.symbol(), "£");
    }

    #[test]
    fn test_currency_code_all() {
        let all = CurrencyCode::all();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_peers_exclude_base() {
        let peers = CurrencyCode::USD.peers();
        assert_eq!(
            peers,
            vec![CurrencyCode::GBP, CurrencyCode::EUR, CurrencyCode::CNY]
        );
    }

    #[test]
    fn test_normalize_rate_pads_and_rounds() {
        let rate = normalize_rate(Decimal::from_str("0.79").unwrap());
        assert_eq!(rate.to_string(), "0.790000");

        let rate = normalize_rate(Decimal::from_str("7.12345650").unwrap());
        assert_eq!(rate.to_string(), "7.123456");

        let rate = normalize_rate(Decimal::from_str("7.1234575").unwrap());
        assert_eq!(rate.to_string(), "7.123458");
    }
}
