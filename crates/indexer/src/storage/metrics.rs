//! Named metrics payloads.

use super::{MetricsRecord, Storage};
use anyhow::{Context, Result};
use sqlx::Row;

impl Storage {
    /// Store `payload` under `name`, replacing any previous payload.
    pub async fn record_metrics(&self, name: &str, payload: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_string(payload).context("Failed to encode metrics payload")?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO metrics (name, payload, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(json)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to record metrics '{}'", name))?;

        Ok(())
    }

    /// Fetch the payload stored under `name`.
    pub async fn get_metrics(&self, name: &str) -> Result<Option<MetricsRecord>> {
        let row = sqlx::query("SELECT name, payload, updated_at FROM metrics WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch metrics '{}'", name))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.get("payload");
        Ok(Some(MetricsRecord {
            name: row.get("name"),
            payload: serde_json::from_str(&payload)
                .with_context(|| format!("Stored metrics '{}' are not valid JSON", name))?,
            updated_at: row.get("updated_at"),
        }))
    }
}
