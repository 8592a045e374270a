use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::candidates::{decode_existing, Candidate};
use crate::store::{CandidateStore, StoreError};

/// Candidate documents in PostgreSQL, one JSONB row per email.
///
/// `position` is the record's index in the last saved collection, so a
/// record keeps its place across upserts and email changes.
#[derive(Debug, Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

/// One row as written by `save`.
#[derive(Debug, Clone, PartialEq)]
struct KeyedRow {
    email_key: String,
    position: i64,
    data: Value,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candidates (
                email_key  TEXT PRIMARY KEY,
                position   BIGINT NOT NULL DEFAULT 0,
                data       JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        // Tables created before positions were tracked.
        sqlx::query("ALTER TABLE candidates ADD COLUMN IF NOT EXISTS position BIGINT NOT NULL DEFAULT 0")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Rows to upsert, keyed by lower-cased email and numbered by collection
/// index. Records without an email cannot be keyed and are left out.
fn keyed_rows(candidates: &[Candidate]) -> Result<Vec<KeyedRow>, StoreError> {
    let mut rows = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        let Some(email_key) = candidate.email_key() else {
            warn!(
                "Not persisting '{}' (id {:?}): records need an email to be stored",
                candidate.display_name(),
                candidate.id
            );
            continue;
        };
        rows.push(KeyedRow {
            email_key,
            position: i64::try_from(index).unwrap_or(i64::MAX),
            data: serde_json::to_value(candidate)?,
        });
    }
    Ok(rows)
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn load(&self) -> Result<Vec<Candidate>, StoreError> {
        let docs: Vec<Value> =
            sqlx::query_scalar("SELECT data FROM candidates ORDER BY position ASC, email_key ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(decode_existing(docs)?)
    }

    /// Upserts every keyed record and deletes rows whose email is no longer
    /// in the collection, all in one transaction.
    async fn save(&self, candidates: &[Candidate]) -> Result<(), StoreError> {
        let rows = keyed_rows(candidates)?;
        let mut tx = self.pool.begin().await?;

        for row in &rows {
            sqlx::query(
                r#"
                INSERT INTO candidates (email_key, position, data)
                VALUES ($1, $2, $3)
                ON CONFLICT (email_key)
                DO UPDATE SET position = EXCLUDED.position,
                              data = EXCLUDED.data,
                              updated_at = now()
                "#,
            )
            .bind(&row.email_key)
            .bind(row.position)
            .bind(&row.data)
            .execute(&mut *tx)
            .await?;
        }

        let keys: Vec<String> = rows.iter().map(|row| row.email_key.clone()).collect();
        let removed = sqlx::query("DELETE FROM candidates WHERE NOT (email_key = ANY($1))")
            .bind(&keys)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        info!(
            "Saved {} candidates to PostgreSQL ({} removed)",
            rows.len(),
            removed
        );
        Ok(())
    }

    fn describe(&self) -> String {
        "postgres table candidates".to_string()
    }
}
