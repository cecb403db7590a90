//! Converter and CurrencyRate domain models.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use exchange_rates::{CurrencyCode, RateTable};

use super::UserId;
use crate::error::DomainError;

pub const MAX_TITLE_LEN: usize = 150;

/// Unique identifier for a Converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ConverterId(Uuid);

impl ConverterId {
    /// Creates a new random ConverterId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ConverterId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for ConverterId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConverterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ConverterId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyRateId(Uuid);

impl CurrencyRateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CurrencyRateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CurrencyRateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rate of one peer currency against the owning converter's base code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub id: CurrencyRateId,
    pub code: CurrencyCode,
    /// Units of `code` per one unit of the base, 6 decimal places
    pub rate: Decimal,
}

/// One user's tracked base currency together with its peer rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Converter {
    pub id: ConverterId,
    pub title: String,
    pub code: CurrencyCode,
    pub rates: Vec<CurrencyRate>,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
    pub owner: UserId,
}

impl Converter {
    /// Creates a converter holding one fresh rate row per peer in `table`.
    ///
    /// # Validation
    /// - Title cannot be blank or longer than [`MAX_TITLE_LEN`] characters
    /// - `table` must be quoted against `code` and carry at least one rate
    pub fn new(
        title: &str,
        code: CurrencyCode,
        owner: UserId,
        table: &RateTable,
    ) -> Result<Self, DomainError> {
        let title = validate_title(title)?;

        if table.base() != code {
            return Err(DomainError::MissingRate(code));
        }
        if table.is_empty() {
            return Err(DomainError::MissingRate(code));
        }

        let rates = table
            .iter()
            .map(|(code, rate)| CurrencyRate {
                id: CurrencyRateId::new(),
                code,
                rate,
            })
            .collect();

        let now = now_micros();
        Ok(Self {
            id: ConverterId::new(),
            title,
            code,
            rates,
            created: now,
            changed: now,
            owner,
        })
    }

    /// Creates a converter with all fields specified (for database reconstruction).
    pub fn from_parts(
        id: ConverterId,
        title: String,
        code: CurrencyCode,
        rates: Vec<CurrencyRate>,
        created: DateTime<Utc>,
        changed: DateTime<Utc>,
        owner: UserId,
    ) -> Self {
        Self {
            id,
            title,
            code,
            rates,
            created,
            changed,
            owner,
        }
    }

    /// Returns the stored rate row for a peer currency.
    pub fn rate_for(&self, code: CurrencyCode) -> Option<&CurrencyRate> {
        self.rates.iter().find(|r| r.code == code)
    }

    /// Overwrites every existing rate in place from `table` and bumps `changed`.
    ///
    /// Peers present in `table` but not stored are ignored. A stored peer that
    /// `table` lacks fails the whole refresh and leaves `self` untouched.
    pub fn refresh(&mut self, table: &RateTable, now: DateTime<Utc>) -> Result<(), DomainError> {
        let mut values = Vec::with_capacity(self.rates.len());
        for rate in &self.rates {
            values.push(table.get(rate.code).ok_or(DomainError::MissingRate(rate.code))?);
        }

        for (rate, value) in self.rates.iter_mut().zip(values) {
            rate.rate = value;
        }
        self.changed = next_changed(self.changed, now);
        Ok(())
    }
}

/// Trims a title and checks its length.
pub fn validate_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::InvalidTitle("Title cannot be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::InvalidTitle(format!(
            "Title cannot be longer than {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

/// Current time truncated to the microsecond precision databases keep.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// `changed` always moves forward, even if the clock did not. One microsecond
/// is the finest step every supported database keeps.
fn next_changed(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    if now >= floor { now } else { floor }
}
