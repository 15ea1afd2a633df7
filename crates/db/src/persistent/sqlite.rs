//! SQLite implementation of the persistent storage layer.

use std::{future::Future, str::FromStr};

use async_trait::async_trait;
use hydra_bridge_primitives::operation::{
    BridgeOperation, LedgerKind, NewBridgeOperation, OperationState,
};
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use tracing::{debug, warn};

use super::{config::DbConfig, errors::StorageError, models::OperationRow};
use crate::{
    errors::{DbError, DbResult},
    operations::OperationDb,
};

/// The workspace migrations, embedded at build time.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

const SELECT_OPERATION: &str = "SELECT id, origin, origin_address, origin_tx_hash,
    origin_output_index, amount, destination, destination_address, destination_tx_hash,
    destination_output_index, state
    FROM bridge_operations";

#[derive(Debug, Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
    config: DbConfig,
}

impl SqliteDb {
    pub fn new(pool: SqlitePool, config: DbConfig) -> Self {
        Self { pool, config }
    }

    /// Opens (creating if needed) the database at `url` and runs the migrations.
    pub async fn connect(url: &str, config: DbConfig) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(StorageError::from)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections())
            .connect_with(options)
            .await
            .map_err(StorageError::from)?;

        MIGRATOR.run(&pool).await.map_err(StorageError::from)?;
        debug!(%url, "database ready");

        Ok(Self::new(pool, config))
    }

    /// Runs `f`, retrying transient storage errors according to the config.
    async fn with_retries<T, F, Fut>(&self, name: &str, f: F) -> DbResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Err(DbError::Storage(e))
                    if e.is_transient() && attempt < self.config.max_retry_count() =>
                {
                    attempt += 1;
                    warn!(%name, %attempt, %e, "transient database error, retrying");
                    tokio::time::sleep(self.config.backoff_period()).await;
                }
                result => return result,
            }
        }
    }

    async fn fetch_by_id(&self, id: i64) -> DbResult<Option<BridgeOperation>> {
        let row: Option<OperationRow> =
            sqlx::query_as(&format!("{SELECT_OPERATION} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?;

        Ok(row.map(BridgeOperation::try_from).transpose()?)
    }

    async fn insert(&self, op: &NewBridgeOperation) -> DbResult<Option<BridgeOperation>> {
        let amount = serde_json::to_string(&op.amount)
            .map_err(|e| StorageError::InvalidData(format!("amount: {e}")))?;

        let row: Option<OperationRow> = sqlx::query_as(
            "INSERT INTO bridge_operations
                (origin, origin_address, origin_tx_hash, origin_output_index, amount,
                 destination, destination_address, destination_output_index, state)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8)
                ON CONFLICT (origin, origin_tx_hash, origin_output_index) DO NOTHING
                RETURNING id, origin, origin_address, origin_tx_hash, origin_output_index,
                    amount, destination, destination_address, destination_tx_hash,
                    destination_output_index, state",
        )
        .bind(op.origin.as_str())
        .bind(&op.origin_address)
        .bind(&op.origin_tx_hash)
        .bind(i64::from(op.origin_output_index))
        .bind(amount)
        .bind(op.destination().as_str())
        .bind(&op.destination_address)
        .bind(OperationState::Pending.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(BridgeOperation::try_from).transpose()?)
    }

    /// Applies a validated state change in a single transaction.
    async fn transition(
        &self,
        id: i64,
        state: OperationState,
        destination: Option<(&str, u32)>,
    ) -> DbResult<BridgeOperation> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let current: Option<(String,)> =
            sqlx::query_as("SELECT state FROM bridge_operations WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        let (current,) = current.ok_or(DbError::NotFound(id))?;
        let from = OperationState::from_str(&current)
            .map_err(|e| StorageError::MismatchedTypes(e.to_string()))?;

        if !from.can_transition_to(state) {
            return Err(DbError::InvalidTransition {
                id,
                from,
                to: state,
            });
        }

        match destination {
            Some((tx_hash, output_index)) => sqlx::query(
                "UPDATE bridge_operations
                    SET state = $1, destination_tx_hash = $2, destination_output_index = $3,
                        updated_at = strftime('%s', 'now')
                    WHERE id = $4",
            )
            .bind(state.as_str())
            .bind(tx_hash)
            .bind(i64::from(output_index))
            .bind(id),
            None => sqlx::query(
                "UPDATE bridge_operations
                    SET state = $1, updated_at = strftime('%s', 'now')
                    WHERE id = $2",
            )
            .bind(state.as_str())
            .bind(id),
        }
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;

        self.fetch_by_id(id).await?.ok_or(DbError::NotFound(id))
    }
}

#[async_trait]
impl OperationDb for SqliteDb {
    async fn create_operation(&self, op: &NewBridgeOperation) -> DbResult<Option<BridgeOperation>> {
        self.with_retries("create_operation", || self.insert(op))
            .await
    }

    async fn find_by_origin(
        &self,
        origin: LedgerKind,
        tx_hash: &str,
        output_index: u32,
    ) -> DbResult<Option<BridgeOperation>> {
        self.with_retries("find_by_origin", || async move {
            let row: Option<OperationRow> = sqlx::query_as(&format!(
                "{SELECT_OPERATION}
                    WHERE origin = $1 AND origin_tx_hash = $2 AND origin_output_index = $3"
            ))
            .bind(origin.as_str())
            .bind(tx_hash)
            .bind(i64::from(output_index))
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

            Ok(row.map(BridgeOperation::try_from).transpose()?)
        })
        .await
    }

    async fn get_operation(&self, id: i64) -> DbResult<Option<BridgeOperation>> {
        self.with_retries("get_operation", || self.fetch_by_id(id))
            .await
    }

    async fn operations_in_state(&self, state: OperationState) -> DbResult<Vec<BridgeOperation>> {
        self.with_retries("operations_in_state", || async move {
            let rows: Vec<OperationRow> =
                sqlx::query_as(&format!("{SELECT_OPERATION} WHERE state = $1 ORDER BY id"))
                    .bind(state.as_str())
                    .fetch_all(&self.pool)
                    .await
                    .map_err(StorageError::from)?;

            rows.into_iter()
                .map(|row| BridgeOperation::try_from(row).map_err(DbError::from))
                .collect()
        })
        .await
    }

    async fn update_state(&self, id: i64, state: OperationState) -> DbResult<BridgeOperation> {
        self.with_retries("update_state", || self.transition(id, state, None))
            .await
    }

    async fn mark_submitted(
        &self,
        id: i64,
        tx_hash: &str,
        output_index: u32,
    ) -> DbResult<BridgeOperation> {
        self.with_retries("mark_submitted", || {
            self.transition(
                id,
                OperationState::Submitted,
                Some((tx_hash, output_index)),
            )
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use hydra_bridge_primitives::types::Asset;

    use super::*;
    use crate::test_suite;

    async fn memory_db() -> SqliteDb {
        // a single connection that never recycles, so the in-memory database lives as long as
        // the pool
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        MIGRATOR.run(&pool).await.unwrap();

        SqliteDb::new(pool, DbConfig::default())
    }

    #[tokio::test]
    async fn behaves_like_an_operation_store() {
        test_suite::exercise(&memory_db().await).await;
    }

    #[tokio::test]
    async fn operations_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("ops.db").display());

        let db = SqliteDb::connect(&url, DbConfig::default()).await.unwrap();
        let op = db
            .create_operation(&NewBridgeOperation {
                origin: LedgerKind::Hydra,
                origin_address: "addr_test1sender".into(),
                origin_tx_hash: "abc".into(),
                origin_output_index: 0,
                amount: vec![Asset::lovelace(7)],
                destination_address: "addr_test1recipient".into(),
            })
            .await
            .unwrap()
            .unwrap();
        db.pool.close().await;

        let db = SqliteDb::connect(&url, DbConfig::default()).await.unwrap();
        assert_eq!(db.get_operation(op.id).await.unwrap(), Some(op));
    }

    #[test]
    fn only_busy_and_pool_errors_are_transient() {
        assert!(StorageError::Driver(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!StorageError::Driver(sqlx::Error::RowNotFound).is_transient());
        assert!(!StorageError::InvalidData("x".into()).is_transient());
    }
}
