//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory) implement this trait.

use crate::domain::{ApiKey, Converter, ConverterId, CurrencyCode, User, UserId};
use crate::error::RepoError;

/// The main repository port for converter operations.
///
/// Every write that touches a converter and its rates MUST be atomic.
/// Implementations should use database transactions to ensure consistency.
#[async_trait::async_trait]
pub trait ConverterRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Users & API keys
    // ─────────────────────────────────────────────────────────────────────────────

    /// Number of registered users.
    async fn count_users(&self) -> Result<i64, RepoError>;

    /// Inserts a user. Fails with `Conflict` if the email is taken.
    async fn create_user(&self, user: User) -> Result<User, RepoError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Issues a new API key for a user. Returns the stored key and the raw
    /// secret, which is never persisted.
    async fn create_api_key(&self, user_id: UserId, name: &str)
    -> Result<(ApiKey, String), RepoError>;

    /// Resolves an active API key hash to its user and records the use.
    async fn authenticate(&self, key_hash: &str) -> Result<Option<User>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Converters (writes MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a converter and all of its rate rows in one transaction.
    /// Fails with `Conflict` if the owner already has a converter for the code.
    async fn insert_converter(&self, converter: Converter) -> Result<Converter, RepoError>;

    /// Gets a converter with its rates.
    async fn get_converter(&self, id: ConverterId) -> Result<Option<Converter>, RepoError>;

    /// Finds the converter `owner` holds for `code`.
    async fn find_converter(
        &self,
        code: CurrencyCode,
        owner: UserId,
    ) -> Result<Option<Converter>, RepoError>;

    /// Persists refreshed rate values, owner and `changed` in one transaction.
    async fn save_refresh(&self, converter: &Converter) -> Result<(), RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Counters
    // ─────────────────────────────────────────────────────────────────────────────

    async fn count_converters(&self) -> Result<i64, RepoError>;

    async fn count_rates(&self) -> Result<i64, RepoError>;
}
