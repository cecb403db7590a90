//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use rust_decimal::Decimal;
use sqlx::FromRow;

use converter_types::{
    Converter, ConverterId, CurrencyCode, CurrencyRate, CurrencyRateId,
    RepoError, User, UserId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};
#[cfg(not(feature = "sqlite"))]
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// User row from database.
#[derive(FromRow)]
pub struct DbUser {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub email: String,

    #[cfg(not(feature = "sqlite"))]
    pub is_staff: bool,
    #[cfg(feature = "sqlite")]
    pub is_staff: i64,

    #[cfg(not(feature = "sqlite"))]
    pub is_superuser: bool,
    #[cfg(feature = "sqlite")]
    pub is_superuser: i64,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

/// Converter row from database (without its rates).
#[derive(FromRow)]
pub struct DbConverter {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub title: String,
    pub code: String,

    #[cfg(not(feature = "sqlite"))]
    pub owner_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub owner_id: String,

    #[cfg(not(feature = "sqlite"))]
    pub created: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created: String,

    #[cfg(not(feature = "sqlite"))]
    pub changed: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub changed: String,
}

/// Currency rate row from database.
#[derive(FromRow)]
pub struct DbCurrencyRate {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub code: String,

    #[cfg(not(feature = "sqlite"))]
    pub rate: Decimal,
    #[cfg(feature = "sqlite")]
    pub rate: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<CurrencyCode, RepoError> {
    CurrencyCode::lookup(s.trim())
        .ok_or_else(|| RepoError::Database(format!("Unknown currency: {}", s)))
}

#[cfg(feature = "sqlite")]
pub fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
pub fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    Ok(chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| RepoError::Database(e.to_string()))?
        .with_timezone(&chrono::Utc))
}

#[cfg(feature = "sqlite")]
pub fn parse_decimal(s: &str) -> Result<Decimal, RepoError> {
    use std::str::FromStr;
    Decimal::from_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

/// Maps a failed write, turning unique violations into `Conflict`.
pub fn map_write_error(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict(
            db.constraint()
                .map(str::to_string)
                .unwrap_or_else(|| db.message().to_string()),
        ),
        _ => RepoError::Database(e.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbUser {
    /// Convert database row to domain User.
    pub fn into_domain(self) -> Result<User, RepoError> {
        #[cfg(not(feature = "sqlite"))]
        let (id, is_staff, is_superuser, created_at) = (
            UserId::from_uuid(self.id),
            self.is_staff,
            self.is_superuser,
            self.created_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, is_staff, is_superuser, created_at) = (
            UserId::from_uuid(parse_uuid(&self.id)?),
            self.is_staff != 0,
            self.is_superuser != 0,
            parse_timestamp(&self.created_at)?,
        );

        Ok(User {
            id,
            email: self.email,
            is_staff,
            is_superuser,
            created_at,
        })
    }
}

impl DbCurrencyRate {
    /// Convert database row to domain CurrencyRate.
    pub fn into_domain(self) -> Result<CurrencyRate, RepoError> {
        let code = parse_currency(&self.code)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, rate) = (CurrencyRateId::from_uuid(self.id), self.rate);

        #[cfg(feature = "sqlite")]
        let (id, rate) = (
            CurrencyRateId::from_uuid(parse_uuid(&self.id)?),
            parse_decimal(&self.rate)?,
        );

        Ok(CurrencyRate {
            id,
            code,
            rate: exchange_rates::normalize_rate(rate),
        })
    }
}

impl DbConverter {
    /// Convert database row plus its rate rows to a domain Converter.
    ///
    /// Rates are returned in currency declaration order regardless of row order.
    pub fn into_domain(self, rates: Vec<DbCurrencyRate>) -> Result<Converter, RepoError> {
        let code = parse_currency(&self.code)?;
        let mut rates = rates
            .into_iter()
            .map(DbCurrencyRate::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        rates.sort_by_key(|r| r.code);

        #[cfg(not(feature = "sqlite"))]
        let (id, owner, created, changed) = (
            ConverterId::from_uuid(self.id),
            UserId::from_uuid(self.owner_id),
            self.created,
            self.changed,
        );

        #[cfg(feature = "sqlite")]
        let (id, owner, created, changed) = (
            ConverterId::from_uuid(parse_uuid(&self.id)?),
            UserId::from_uuid(parse_uuid(&self.owner_id)?),
            parse_timestamp(&self.created)?,
            parse_timestamp(&self.changed)?,
        );

        Ok(Converter::from_parts(
            id, self.title, code, rates, created, changed, owner,
        ))
    }
}
