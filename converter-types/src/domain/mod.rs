//! Domain models for the converter service.

pub mod api_key;
pub mod conversion;
pub mod converter;
pub mod user;

pub use api_key::{ApiKey, ApiKeyId};
pub use conversion::Conversion;
pub use converter::{
    Converter, ConverterId, CurrencyRate, CurrencyRateId, MAX_TITLE_LEN, now_micros,
};
pub use exchange_rates::CurrencyCode;
pub use user::{User, UserId};
