//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Conversion, Converter, ConverterId, CurrencyCode, CurrencyRate, User, UserId};
use crate::error::messages;

// ─────────────────────────────────────────────────────────────────────────────
// Converter DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a new converter.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateConverterRequest {
    /// Display name
    #[schema(example = "Dollars")]
    pub title: String,
    /// Base currency code, any case
    #[schema(example = "USD")]
    pub code: String,
    /// Email of the owner; must be the caller's own email
    #[schema(example = "test@test.com")]
    pub converter_user: String,
}

/// Response after creating a converter.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConverterResponse {
    pub id: ConverterId,
    #[schema(example = "Dollars")]
    pub title: String,
    pub code: CurrencyCode,
    /// Owner email
    #[schema(example = "test@test.com")]
    pub converter_user: String,
}

impl ConverterResponse {
    pub fn from_domain(converter: &Converter, owner: &User) -> Self {
        Self {
            id: converter.id,
            title: converter.title.clone(),
            code: converter.code,
            converter_user: owner.email.clone(),
        }
    }
}

/// One stored peer rate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrencyRateResponse {
    pub code: CurrencyCode,
    /// Decimal rendered as a string with 6 decimal places
    #[schema(value_type = String, example = "0.790000")]
    pub currency_rate: Decimal,
}

impl From<&CurrencyRate> for CurrencyRateResponse {
    fn from(rate: &CurrencyRate) -> Self {
        Self {
            code: rate.code,
            currency_rate: rate.rate,
        }
    }
}

/// Full converter view returned by detail and update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConverterDetailResponse {
    pub id: ConverterId,
    #[schema(example = "Dollars")]
    pub title: String,
    pub code: CurrencyCode,
    pub rate: Vec<CurrencyRateResponse>,
    /// Owner email
    #[schema(example = "test@test.com")]
    pub converter_user: String,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

impl ConverterDetailResponse {
    pub fn from_domain(converter: &Converter, owner: &User) -> Self {
        Self {
            id: converter.id,
            title: converter.title.clone(),
            code: converter.code,
            rate: converter.rates.iter().map(CurrencyRateResponse::from).collect(),
            converter_user: owner.email.clone(),
            created: converter.created,
            changed: converter.changed,
        }
    }
}

/// Request to refresh a converter's rates. The code must be one the caller has
/// added; the converter's own code is what gets refreshed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateConverterRequest {
    #[schema(example = "USD")]
    pub code: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversion DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to convert an amount using the caller's stored rates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConvertRequest {
    #[schema(example = "USD")]
    pub base_currency: String,
    #[schema(example = "CNY")]
    pub target_currency: String,
    /// Integer amount; an integer string such as `"200"` is accepted too
    #[schema(example = 200)]
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: i64,
}

/// Accepts a JSON integer or a string holding one. Fractions are rejected.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("an integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::custom(messages::INVALID_INTEGER))
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> Result<i64, E> {
            Err(E::custom(messages::INVALID_INTEGER))
        }

        fn visit_bool<E: de::Error>(self, _: bool) -> Result<i64, E> {
            Err(E::custom(messages::INVALID_INTEGER))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim()
                .parse()
                .map_err(|_| E::custom(messages::INVALID_INTEGER))
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

/// Human-readable conversion result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConvertResponse {
    #[schema(example = "200 USD = 1424.691200 CNY")]
    pub converter: String,
}

impl From<Conversion> for ConvertResponse {
    fn from(conversion: Conversion) -> Self {
        Self {
            converter: conversion.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create the very first user. Only allowed while no users exist.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BootstrapRequest {
    #[schema(example = "admin@example.com")]
    pub email: String,
}

/// Request (staff only) to register another user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "test@test.com")]
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    #[schema(example = "test@test.com")]
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
        }
    }
}

/// A freshly registered user and their API key (shown only once).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyIssued {
    pub user: UserResponse,
    /// The generated API key (shown only once)
    #[schema(example = "sk_abc123xyz...")]
    pub api_key: String,
    /// Informational message
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount_of(body: &str) -> Result<i64, serde_json::Error> {
        serde_json::from_str::<ConvertRequest>(body).map(|req| req.amount)
    }

    #[test]
    fn test_amount_accepts_integers_and_integer_strings() {
        let body = r#"{"base_currency": "USD", "target_currency": "CNY", "amount": 200}"#;
        assert_eq!(amount_of(body).unwrap(), 200);

        let body = r#"{"base_currency": "USD", "target_currency": "CNY", "amount": " -15 "}"#;
        assert_eq!(amount_of(body).unwrap(), -15);
    }

    #[test]
    fn test_amount_rejects_fractions_and_text() {
        for amount in ["2.5", r#""2.5""#, r#""ten""#, "true", "18446744073709551615"] {
            let body = format!(
                r#"{{"base_currency": "USD", "target_currency": "CNY", "amount": {amount}}}"#
            );
            let err = amount_of(&body).unwrap_err();
            assert!(
                err.to_string().contains(messages::INVALID_INTEGER),
                "{amount}: {err}"
            );
        }
    }
}
