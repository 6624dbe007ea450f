//! Edge storage operations.
//!
//! The edge table is only written through [`Storage::apply_changeset`], which runs
//! bulk insert, per-row capacity updates and bulk delete on one transaction.

use std::future::Future;

use super::{Changeset, Storage};
use sqlx::{QueryBuilder, Row, Sqlite};
use trustgraph_core::{Address, EdgeId, StoredEdge};
use trustgraph_engine::TransferGraph;

/// Rows per multi-row `INSERT` (5 binds each, well under SQLite's bind limit).
const INSERT_CHUNK: usize = 150;

/// Ids per `DELETE ... WHERE id IN (...)`.
const DELETE_CHUNK: usize = 500;

/// Edge store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected an operation.
    #[error("Database error during {operation}: {source}")]
    Database {
        /// What was being done.
        operation: &'static str,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// A write touched a different number of rows than the changeset expects.
    #[error("Stale changeset during {operation}: expected {expected} rows, affected {affected}")]
    Stale {
        /// What was being done.
        operation: &'static str,
        /// Rows the changeset targeted.
        expected: u64,
        /// Rows actually affected.
        affected: u64,
    },

    /// A stored row could not be decoded.
    #[error("Corrupt edge row {id}: {reason}")]
    CorruptRow {
        /// Row id.
        id: i64,
        /// What was wrong.
        reason: String,
    },
}

fn db(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |source| StoreError::Database { operation, source }
}

fn expect_rows(operation: &'static str, expected: u64, affected: u64) -> Result<(), StoreError> {
    if expected != affected {
        return Err(StoreError::Stale {
            operation,
            expected,
            affected,
        });
    }
    Ok(())
}

/// Persistent edge store used by the synchronizer.
pub trait EdgeStore {
    /// Load every stored edge, ordered by `from`.
    fn list_edges(&self) -> impl Future<Output = Result<Vec<StoredEdge>, StoreError>> + Send;

    /// Apply a changeset atomically.
    fn apply_changeset(
        &self,
        changeset: &Changeset,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl EdgeStore for Storage {
    async fn list_edges(&self) -> Result<Vec<StoredEdge>, StoreError> {
        Storage::list_edges(self).await
    }

    async fn apply_changeset(&self, changeset: &Changeset) -> Result<(), StoreError> {
        Storage::apply_changeset(self, changeset).await
    }
}

impl Storage {
    /// Get all stored edges, ordered by `(from, to, token)`.
    pub async fn list_edges(&self) -> Result<Vec<StoredEdge>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, from_addr, to_addr, token, capacity
            FROM edges
            ORDER BY from_addr, to_addr, token, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db("list edges"))?;

        rows.into_iter().map(Self::row_to_stored_edge).collect()
    }

    /// Count stored edges.
    pub async fn count_edges(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM edges")
            .fetch_one(&self.pool)
            .await
            .map_err(db("count edges"))?;
        Ok(count as u64)
    }

    /// Load the stored edges as the solver-facing graph.
    pub async fn load_transfer_graph(&self) -> Result<TransferGraph, StoreError> {
        let edges = self.list_edges().await?;
        Ok(TransferGraph::from_stored(&edges))
    }

    /// Apply a changeset in a single transaction.
    ///
    /// Inserts, capacity updates and deletes either all commit or none do; on
    /// any error the transaction is dropped and SQLite rolls it back. Updates and
    /// deletes must hit exactly the targeted rows, otherwise the changeset was
    /// computed against a stale view and is rejected.
    pub async fn apply_changeset(&self, changeset: &Changeset) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(db("begin transaction"))?;

        for chunk in changeset.to_add.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO edges (from_addr, to_addr, token, capacity, updated_at) ",
            );
            builder.push_values(chunk, |mut row, edge| {
                row.push_bind(edge.from.as_slice().to_vec())
                    .push_bind(edge.to.as_slice().to_vec())
                    .push_bind(edge.token.as_slice().to_vec())
                    .push_bind(edge.capacity as i64)
                    .push_bind(now);
            });

            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(db("insert edges"))?;
        }

        for update in &changeset.to_update {
            let result = sqlx::query("UPDATE edges SET capacity = ?, updated_at = ? WHERE id = ?")
                .bind(update.capacity as i64)
                .bind(now)
                .bind(update.id.0)
                .execute(&mut *tx)
                .await
                .map_err(db("update edge capacity"))?;

            expect_rows("update edge capacity", 1, result.rows_affected())?;
        }

        for chunk in changeset.to_remove.chunks(DELETE_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM edges WHERE id IN (");
            let mut ids = builder.separated(", ");
            for id in chunk {
                ids.push_bind(id.0);
            }
            ids.push_unseparated(")");

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(db("delete edges"))?;

            expect_rows("delete edges", chunk.len() as u64, result.rows_affected())?;
        }

        tx.commit().await.map_err(db("commit changeset"))?;

        Ok(())
    }

    fn row_to_stored_edge(row: sqlx::sqlite::SqliteRow) -> Result<StoredEdge, StoreError> {
        let id: i64 = row.try_get("id").map_err(db("decode edge row"))?;
        let from: Vec<u8> = row.try_get("from_addr").map_err(db("decode edge row"))?;
        let to: Vec<u8> = row.try_get("to_addr").map_err(db("decode edge row"))?;
        let token: Vec<u8> = row.try_get("token").map_err(db("decode edge row"))?;
        let capacity: i64 = row.try_get("capacity").map_err(db("decode edge row"))?;

        let address = |bytes: Vec<u8>, column: &str| {
            <[u8; 20]>::try_from(bytes.as_slice())
                .map(Address::from)
                .map_err(|_| StoreError::CorruptRow {
                    id,
                    reason: format!("{} has {} bytes, expected 20", column, bytes.len()),
                })
        };

        if capacity <= 0 {
            return Err(StoreError::CorruptRow {
                id,
                reason: format!("non-positive capacity {}", capacity),
            });
        }

        Ok(StoredEdge {
            id: EdgeId(id),
            from: address(from, "from_addr")?,
            to: address(to, "to_addr")?,
            token: address(token, "token")?,
            capacity: capacity as u64,
        })
    }
}
