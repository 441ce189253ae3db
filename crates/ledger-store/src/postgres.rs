use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, Result, StoreError, StoredEvent, Version,
    store::{CommitReceipt, LedgerStore, Transaction},
};

/// PostgreSQL-backed ledger store.
///
/// A commit runs in one database transaction. Version checks are backed by
/// the `unique_stream_version` constraint, so two writers racing on the same
/// stream cannot both succeed even if both pass the up-front check.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Creates a new PostgreSQL ledger store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<StoredEvent> {
        Ok(StoredEvent {
            event_id: row.try_get::<Uuid, _>("id")?,
            transaction_id: row.try_get::<Uuid, _>("transaction_id")?,
            stream_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("stream_id")?),
            stream_type: row.try_get("stream_type")?,
            event_type: row.try_get("event_type")?,
            version: Version::new(row.try_get("version")?),
            recorded_at: row.try_get("recorded_at")?,
            payload: row.try_get("payload")?,
        })
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[tracing::instrument(skip(self, transaction), fields(transaction_id = %transaction.id()))]
    async fn commit(&self, transaction: Transaction) -> Result<CommitReceipt> {
        transaction.validate()?;

        let transaction_id = transaction.id();
        let mut tx = self.pool.begin().await?;
        let mut versions = Vec::with_capacity(transaction.appends().len());

        for append in transaction.appends() {
            let stream_id = append.stream_id();
            let expected = append.expected_version();

            let current: Option<i64> =
                sqlx::query_scalar("SELECT MAX(version) FROM ledger_events WHERE stream_id = $1")
                    .bind(stream_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?;
            let actual = Version::new(current.unwrap_or(0));

            if actual != expected {
                metrics::counter!("ledger_commit_conflicts_total").increment(1);
                return Err(StoreError::ConcurrencyConflict {
                    stream_id,
                    expected,
                    actual,
                });
            }

            for event in append.events() {
                sqlx::query(
                    r#"
                    INSERT INTO ledger_events (id, transaction_id, stream_id, stream_type, event_type, version, recorded_at, payload)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    "#,
                )
                .bind(event.event_id)
                .bind(transaction_id)
                .bind(stream_id.as_uuid())
                .bind(&event.stream_type)
                .bind(&event.event_type)
                .bind(event.version.as_i64())
                .bind(event.recorded_at)
                .bind(&event.payload)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(ref db_err) = e
                        && db_err.constraint() == Some("unique_stream_version")
                    {
                        metrics::counter!("ledger_commit_conflicts_total").increment(1);
                        return StoreError::ConcurrencyConflict {
                            stream_id,
                            expected,
                            actual: event.version,
                        };
                    }
                    StoreError::Database(e)
                })?;
            }

            versions.push((stream_id, append.last_version()));
        }

        tx.commit().await?;
        metrics::counter!("ledger_commits_total").increment(1);

        Ok(CommitReceipt {
            transaction_id,
            versions,
        })
    }

    async fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, transaction_id, stream_id, stream_type, event_type, version, recorded_at, payload
            FROM ledger_events
            WHERE stream_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(stream_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }
}
