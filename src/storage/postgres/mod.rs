//! `PostgreSQL` storage backend.
//!
//! Counter writes take a row lock on exactly one `sequence_counters` row:
//! ```sql
//! BEGIN;
//! SET LOCAL lock_timeout = '5000ms';
//! SELECT ... FROM sequence_counters c JOIN sequence_configs s USING (...)
//!     WHERE ... FOR UPDATE OF c;
//! -- apply the mutation
//! UPDATE sequence_counters SET ...;
//! COMMIT;
//! ```
//!
//! Writes never insert a counter row. Rows are created with the configuration
//! and removed with it in one transaction, so a write that was waiting on a
//! deleted row finds nothing and fails with [`StorageError::Missing`].
//!
//! A lock wait that exceeds `lock_timeout` aborts the transaction with SQLSTATE
//! `55P03`, which surfaces as [`StorageError::LockTimeout`]; nothing was written.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::info;

use crate::config::PostgresStorageConfig;
use crate::domain::{
    AuditEntry, CounterMutation, CounterState, CounterTransition, GeneratedNumber, ResetPeriod,
    SequenceConfig, SequenceKey,
};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::{ConfigStorage, CounterStorage, HistoryStorage, LockSettings, Storage};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// `PostgreSQL` storage implementation.
pub struct PgStorage {
    pool: PgPool,
    lock: LockSettings,
}

impl PgStorage {
    /// Connect, run migrations and return the storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable or a migration fails.
    pub async fn connect(config: &PostgresStorageConfig, lock: LockSettings) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        info!("Connected to PostgreSQL");

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StorageError::Query(format!("migration failed: {e}")))?;

        Ok(Self::from_pool(pool, lock))
    }

    /// Wrap an existing pool. Migrations are not run.
    #[must_use]
    pub const fn from_pool(pool: PgPool, lock: LockSettings) -> Self {
        Self { pool, lock }
    }

    /// Start a transaction whose lock waits give up after the configured timeout.
    async fn begin_locking(&self) -> StorageResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        // SET does not take bind parameters.
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock.timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;
        Ok(tx)
    }

    /// Map a lock error to a timeout naming `key`.
    fn lock_error(&self, key: &SequenceKey, err: sqlx::Error) -> StorageError {
        match StorageError::from(err) {
            StorageError::LockTimeout(_) => StorageError::LockTimeout(format!(
                "'{key}' still locked after {}ms",
                self.lock.timeout.as_millis()
            )),
            other => other,
        }
    }
}

fn to_i64(value: u64, what: &str) -> StorageResult<i64> {
    i64::try_from(value).map_err(|_| StorageError::Exhausted(format!("{what} {value} exceeds BIGINT")))
}

fn to_u64(value: i64, what: &str) -> StorageResult<u64> {
    u64::try_from(value).map_err(|_| StorageError::Serialization(format!("negative {what}: {value}")))
}

fn config_from_row(row: &PgRow) -> StorageResult<SequenceConfig> {
    let reset_period: String = row.try_get("reset_period")?;
    let reset_limit: Option<i64> = row.try_get("reset_limit")?;
    let padding: i16 = row.try_get("padding")?;

    Ok(SequenceConfig {
        scope_id: row.try_get("scope_id")?,
        sequence_name: row.try_get("sequence_name")?,
        pattern: row.try_get("pattern")?,
        reset_period: reset_period
            .parse::<ResetPeriod>()
            .map_err(StorageError::Serialization)?,
        reset_limit: reset_limit.map(|v| to_u64(v, "reset_limit")).transpose()?,
        reset_base: to_u64(row.try_get("reset_base")?, "reset_base")?,
        padding: u8::try_from(padding)
            .map_err(|_| StorageError::Serialization(format!("invalid padding: {padding}")))?,
        step_size: to_u64(row.try_get("step_size")?, "step_size")?,
        evaluator: row.try_get("evaluator")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn counter_from_row(row: &PgRow) -> StorageResult<CounterState> {
    Ok(CounterState {
        counter: to_u64(row.try_get("current_value")?, "current_value")?,
        updated_at: row.try_get("updated_at")?,
        last_reset_at: row.try_get("last_reset_at")?,
    })
}

const CONFIG_COLUMNS: &str = "scope_id, sequence_name, pattern, reset_period, reset_limit, \
     reset_base, padding, step_size, evaluator, created_at, updated_at";

/// Bind every column of `config` in `CONFIG_COLUMNS` order.
fn bind_config<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    config: &'q SequenceConfig,
) -> StorageResult<sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>> {
    Ok(query
        .bind(&config.scope_id)
        .bind(&config.sequence_name)
        .bind(&config.pattern)
        .bind(config.reset_period.to_string())
        .bind(
            config
                .reset_limit
                .map(|v| to_i64(v, "reset_limit"))
                .transpose()?,
        )
        .bind(to_i64(config.reset_base, "reset_base")?)
        .bind(i16::from(config.padding))
        .bind(to_i64(config.step_size, "step_size")?)
        .bind(&config.evaluator)
        .bind(config.created_at)
        .bind(config.updated_at))
}

#[async_trait]
impl ConfigStorage for PgStorage {
    async fn save_config(&self, config: &SequenceConfig) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO sequence_configs ({CONFIG_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (scope_id, sequence_name) DO UPDATE SET
                 pattern = EXCLUDED.pattern,
                 reset_period = EXCLUDED.reset_period,
                 reset_limit = EXCLUDED.reset_limit,
                 reset_base = EXCLUDED.reset_base,
                 padding = EXCLUDED.padding,
                 step_size = EXCLUDED.step_size,
                 evaluator = EXCLUDED.evaluator,
                 updated_at = EXCLUDED.updated_at"
        );
        bind_config(sqlx::query(&sql), config)?
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_config_if_absent(
        &self,
        config: &SequenceConfig,
    ) -> StorageResult<Option<SequenceConfig>> {
        let sql = format!(
            "INSERT INTO sequence_configs ({CONFIG_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (scope_id, sequence_name) DO NOTHING
             RETURNING scope_id"
        );
        let inserted = bind_config(sqlx::query(&sql), config)?
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if inserted {
            return Ok(None);
        }

        match self.get_config(&config.key()).await? {
            Some(existing) => Ok(Some(existing)),
            None => Err(StorageError::Query(format!(
                "config '{}' vanished after conflict",
                config.key()
            ))),
        }
    }

    async fn get_config(&self, key: &SequenceKey) -> StorageResult<Option<SequenceConfig>> {
        let sql = format!(
            "SELECT {CONFIG_COLUMNS} FROM sequence_configs
             WHERE scope_id = $1 AND sequence_name = $2"
        );
        let row = sqlx::query(&sql)
            .bind(&key.scope_id)
            .bind(&key.sequence_name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(config_from_row).transpose()
    }

    async fn list_configs(&self, scope_id: &str) -> StorageResult<Vec<SequenceConfig>> {
        let sql = format!(
            "SELECT {CONFIG_COLUMNS} FROM sequence_configs
             WHERE scope_id = $1 ORDER BY sequence_name"
        );
        let rows = sqlx::query(&sql)
            .bind(scope_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(config_from_row).collect()
    }

    async fn delete_config(&self, key: &SequenceKey) -> StorageResult<bool> {
        let mut tx = self.begin_locking().await?;

        sqlx::query("DELETE FROM sequence_counters WHERE scope_id = $1 AND sequence_name = $2")
            .bind(&key.scope_id)
            .bind(&key.sequence_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| self.lock_error(key, e))?;

        let deleted =
            sqlx::query("DELETE FROM sequence_configs WHERE scope_id = $1 AND sequence_name = $2")
                .bind(&key.scope_id)
                .bind(&key.sequence_name)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl CounterStorage for PgStorage {
    async fn get_counter(&self, key: &SequenceKey) -> StorageResult<Option<CounterState>> {
        let row = sqlx::query(
            "SELECT current_value, updated_at, last_reset_at FROM sequence_counters
             WHERE scope_id = $1 AND sequence_name = $2",
        )
        .bind(&key.scope_id)
        .bind(&key.sequence_name)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(counter_from_row).transpose()
    }

    async fn init_counter(&self, key: &SequenceKey, now: DateTime<Utc>) -> StorageResult<()> {
        // Only alongside a configuration; a delete that raced ahead wins.
        sqlx::query(
            "INSERT INTO sequence_counters (scope_id, sequence_name, current_value, updated_at)
             SELECT scope_id, sequence_name, 0, $3 FROM sequence_configs
             WHERE scope_id = $1 AND sequence_name = $2
             ON CONFLICT (scope_id, sequence_name) DO NOTHING",
        )
        .bind(&key.scope_id)
        .bind(&key.sequence_name)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn apply(
        &self,
        key: &SequenceKey,
        mutation: CounterMutation,
        now: DateTime<Utc>,
    ) -> StorageResult<CounterTransition> {
        let mut tx = self.begin_locking().await?;

        // Lock the row so updates are linearizable per (scope_id, sequence_name).
        let row = sqlx::query(
            "SELECT c.current_value, c.updated_at, c.last_reset_at
             FROM sequence_counters c
             JOIN sequence_configs s
               ON s.scope_id = c.scope_id AND s.sequence_name = c.sequence_name
             WHERE c.scope_id = $1 AND c.sequence_name = $2
             FOR UPDATE OF c",
        )
        .bind(&key.scope_id)
        .bind(&key.sequence_name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| self.lock_error(key, e))?
        .ok_or_else(|| StorageError::Missing(key.to_string()))?;

        let previous = counter_from_row(&row)?;
        let transition = mutation
            .apply(&previous, now)
            .map_err(|_| StorageError::Exhausted(key.to_string()))?;

        sqlx::query(
            "UPDATE sequence_counters
             SET current_value = $3, updated_at = $4, last_reset_at = $5
             WHERE scope_id = $1 AND sequence_name = $2",
        )
        .bind(&key.scope_id)
        .bind(&key.sequence_name)
        .bind(to_i64(transition.current.counter, "counter")?)
        .bind(transition.current.updated_at)
        .bind(transition.current.last_reset_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(transition)
    }
}

#[async_trait]
impl HistoryStorage for PgStorage {
    async fn record_generated(&self, number: &GeneratedNumber) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO sequence_history
                 (id, scope_id, sequence_name, value, counter, reset, generated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(number.id)
        .bind(&number.metadata.scope_id)
        .bind(&number.metadata.sequence_name)
        .bind(&number.value)
        .bind(to_i64(number.counter, "counter")?)
        .bind(number.metadata.reset.map(|r| r.to_string()))
        .bind(number.generated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_audit(&self, entry: &AuditEntry) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO sequence_audit
                 (action, scope_id, sequence_name, old_value, new_value, actor, reason, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.action.to_string())
        .bind(&entry.scope_id)
        .bind(&entry.sequence_name)
        .bind(entry.old_value.map(|v| to_i64(v, "old_value")).transpose()?)
        .bind(entry.new_value.map(|v| to_i64(v, "new_value")).transpose()?)
        .bind(&entry.actor)
        .bind(&entry.reason)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgresql"
    }
}
