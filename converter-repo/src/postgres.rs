//! PostgreSQL repository adapter.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use converter_types::{
    ApiKey, Converter, ConverterId, ConverterRepository, CurrencyCode, RepoError, User, UserId,
    now_micros,
};

use crate::types::{DbConverter, DbCurrencyRate, DbUser, map_write_error};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository with row-level locking on refresh.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_users_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_converters_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn load_rates<'e, E>(executor: E, converter_id: Uuid) -> Result<Vec<DbCurrencyRate>, RepoError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query_as(r#"SELECT id, code, rate FROM currency_rates WHERE converter_id = $1"#)
            .bind(converter_id)
            .fetch_all(executor)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn hydrate(&self, row: Option<DbConverter>) -> Result<Option<Converter>, RepoError> {
        match row {
            Some(row) => {
                let rates = Self::load_rates(&self.pool, row.id).await?;
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
impl ConverterRepository for PostgresRepo {
    async fn count_users(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }

    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, is_staff, is_superuser, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id.into_uuid())
        .bind(&user.email)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> = sqlx::query_as(
            r#"SELECT id, email, is_staff, is_superuser, created_at FROM users WHERE id = $1"#,
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> = sqlx::query_as(
            r#"SELECT id, email, is_staff, is_superuser, created_at FROM users WHERE email = $1"#,
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
            r#"
            INSERT INTO api_keys (id, name, key_hash, user_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            "#,
        )
        .bind(*api_key.id.as_uuid())
        .bind(&api_key.name)
        .bind(&api_key.key_hash)
        .bind(user_id.into_uuid())
        .bind(api_key.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok((api_key, raw_key))
    }

    async fn authenticate(&self, key_hash: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> = sqlx::query_as(
            r#"
            UPDATE api_keys k SET last_used_at = $2
            FROM users u
            WHERE u.id = k.user_id AND k.key_hash = $1 AND k.is_active = TRUE
            RETURNING u.id, u.email, u.is_staff, u.is_superuser, u.created_at
            "#,
        )
        .bind(key_hash)
        .bind(now_micros())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn insert_converter(&self, converter: Converter) -> Result<Converter, RepoError> {
        let id = converter.id.into_uuid();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO converters (id, title, code, owner_id, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&converter.title)
        .bind(converter.code.code())
        .bind(converter.owner.into_uuid())
        .bind(converter.created)
        .bind(converter.changed)
        .execute(&mut *db_tx)
        .await
        .map_err(map_write_error)?;

        for rate in &converter.rates {
            sqlx::query(
                r#"INSERT INTO currency_rates (id, converter_id, code, rate) VALUES ($1, $2, $3, $4)"#,
            )
            .bind(*rate.id.as_uuid())
            .bind(id)
            .bind(rate.code.code())
            .bind(rate.rate)
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
            r#"SELECT id, title, code, owner_id, created, changed FROM converters WHERE id = $1"#,
        )
        .bind(id.into_uuid())
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
            r#"
            SELECT id, title, code, owner_id, created, changed
            FROM converters WHERE code = $1 AND owner_id = $2
            "#,
        )
        .bind(code.code())
        .bind(owner.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        self.hydrate(row).await
    }

    async fn save_refresh(&self, converter: &Converter) -> Result<(), RepoError> {
        let id = converter.id.into_uuid();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // Lock the converter row so concurrent refreshes serialize
        let locked: Option<(Uuid,)> =
            sqlx::query_as(r#"SELECT id FROM converters WHERE id = $1 FOR UPDATE"#)
                .bind(id)
                .fetch_optional(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        if locked.is_none() {
            return Err(RepoError::NotFound);
        }

        sqlx::query(r#"UPDATE converters SET owner_id = $1, changed = $2 WHERE id = $3"#)
            .bind(converter.owner.into_uuid())
            .bind(converter.changed)
            .bind(id)
            .execute(&mut *db_tx)
            .await
            .map_err(map_write_error)?;

        for rate in &converter.rates {
            sqlx::query(r#"UPDATE currency_rates SET rate = $1 WHERE id = $2 AND converter_id = $3"#)
                .bind(rate.rate)
                .bind(*rate.id.as_uuid())
                .bind(id)
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
