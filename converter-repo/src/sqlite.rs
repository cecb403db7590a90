//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use std::str::FromStr;

use converter_types::{
    ApiKey, Converter, ConverterId, ConverterRepository, CurrencyCode, RepoError, User, UserId,
    now_micros,
};

use crate::types::{DbConverter, DbCurrencyRate, DbUser, map_write_error};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

const MIGRATIONS: [&str; 2] = [
    include_str!("../migrations/0001_create_users.sql"),
    include_str!("../migrations/0002_create_converters.sql"),
];

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:");

        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if !in_memory {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every in-memory connection is its own database, so keep exactly one.
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await?
        } else {
            SqlitePool::connect_with(options).await?
        };

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        for ddl in MIGRATIONS {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;
        }
        Ok(())
    }

    async fn load_rates<'e, E>(executor: E, converter_id: &str) -> Result<Vec<DbCurrencyRate>, RepoError>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(r#"SELECT id, code, rate FROM currency_rates WHERE converter_id = ?"#)
            .bind(converter_id)
            .fetch_all(executor)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn hydrate(&self, row: Option<DbConverter>) -> Result<Option<Converter>, RepoError> {
        match row {
            Some(row) => {
                let rates = Self::load_rates(&self.pool, &row.id).await?;
                row.into_domain(rates).map(Some)
            }
            None => Ok(None),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ConverterRepository for SqliteRepo {
    async fn count_users(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }

    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        sqlx::query(
            r#"INSERT INTO users (id, email, is_staff, is_superuser, created_at) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> = sqlx::query_as(
            r#"SELECT id, email, is_staff, is_superuser, created_at FROM users WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> = sqlx::query_as(
            r#"SELECT id, email, is_staff, is_superuser, created_at FROM users WHERE email = ?"#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn create_api_key(
        &self,
        user_id: UserId,
        name: &str,
    ) -> Result<(ApiKey, String), RepoError> {
        let raw_key = crate::security::generate_api_key();
        let api_key = ApiKey::new(
            name.to_string(),
            crate::security::hash_api_key(&raw_key),
            user_id,
        );

        sqlx::query(
            r#"INSERT INTO api_keys (id, name, key_hash, user_id, is_active, created_at) VALUES (?, ?, ?, ?, 1, ?)"#,
        )
        .bind(api_key.id.to_string())
        .bind(&api_key.name)
        .bind(&api_key.key_hash)
        .bind(user_id.to_string())
        .bind(api_key.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok((api_key, raw_key))
    }

    async fn authenticate(&self, key_hash: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> = sqlx::query_as(
            r#"SELECT u.id, u.email, u.is_staff, u.is_superuser, u.created_at
               FROM api_keys k JOIN users u ON u.id = k.user_id
               WHERE k.key_hash = ? AND k.is_active = 1"#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query(r#"UPDATE api_keys SET last_used_at = ? WHERE key_hash = ?"#)
            .bind(now_micros().to_rfc3339())
            .bind(key_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        row.into_domain().map(Some)
    }

    async fn insert_converter(&self, converter: Converter) -> Result<Converter, RepoError> {
        let id_str = converter.id.to_string();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO converters (id, title, code, owner_id, created, changed) VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id_str)
        .bind(&converter.title)
        .bind(converter.code.code())
        .bind(converter.owner.to_string())
        .bind(converter.created.to_rfc3339())
        .bind(converter.changed.to_rfc3339())
        .execute(&mut *db_tx)
        .await
        .map_err(map_write_error)?;

        for rate in &converter.rates {
            sqlx::query(
                r#"INSERT INTO currency_rates (id, converter_id, code, rate) VALUES (?, ?, ?, ?)"#,
            )
            .bind(rate.id.to_string())
            .bind(&id_str)
            .bind(rate.code.code())
            .bind(rate.rate.to_string())
            .execute(&mut *db_tx)
            .await
            .map_err(map_write_error)?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(converter)
    }

    async fn get_converter(&self, id: ConverterId) -> Result<Option<Converter>, RepoError> {
        let row: Option<DbConverter> = sqlx::query_as(
            r#"SELECT id, title, code, owner_id, created, changed FROM converters WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        self.hydrate(row).await
    }

    async fn find_converter(
        &self,
        code: CurrencyCode,
        owner: UserId,
    ) -> Result<Option<Converter>, RepoError> {
        let row: Option<DbConverter> = sqlx::query_as(
            r#"SELECT id, title, code, owner_id, created, changed FROM converters WHERE code = ? AND owner_id = ?"#,
        )
        .bind(code.code())
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        self.hydrate(row).await
    }

    async fn save_refresh(&self, converter: &Converter) -> Result<(), RepoError> {
        let id_str = converter.id.to_string();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        let result = sqlx::query(r#"UPDATE converters SET owner_id = ?, changed = ? WHERE id = ?"#)
            .bind(converter.owner.to_string())
            .bind(converter.changed.to_rfc3339())
            .bind(&id_str)
            .execute(&mut *db_tx)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        for rate in &converter.rates {
            sqlx::query(r#"UPDATE currency_rates SET rate = ? WHERE id = ? AND converter_id = ?"#)
                .bind(rate.rate.to_string())
                .bind(rate.id.to_string())
                .bind(&id_str)
                .execute(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn count_converters(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM converters")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }

    async fn count_rates(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM currency_rates")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }
}
