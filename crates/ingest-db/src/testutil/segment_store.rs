//! `SQLite` test double for `SegmentStorePort`. Vector search is not
//! approximated here; `ensure_vector_index` is a no-op.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use ingest_core::{RepositoryError, Segment, SegmentStorePort, SourceMeta};

pub struct SqliteSegmentStore {
    pool: SqlitePool,
}

impl SqliteSegmentStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn source_id(&self, external_id: &str) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT id FROM sources WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        match row {
            Some(row) => row
                .try_get::<i64, _>("id")
                .map_err(|e| RepositoryError::Storage(e.to_string())),
            None => Err(RepositoryError::NotFound(format!("source '{external_id}'"))),
        }
    }
}

/// Mirrors the Postgres adapter's conflict mapping so the two doubles
/// exhibit the same conflict-then-retry behavior under test.
fn map_insert_error(e: &sqlx::Error, external_id: &str, segment: &Segment) -> RepositoryError {
    if e.as_database_error().is_some_and(sqlx::error::DatabaseError::is_unique_violation) {
        RepositoryError::Conflict(format!(
            "duplicate natural key for '{external_id}': start={} end={}",
            segment.start, segment.end
        ))
    } else {
        RepositoryError::Storage(e.to_string())
    }
}

#[async_trait]
impl SegmentStorePort for SqliteSegmentStore {
    async fn upsert_source(&self, meta: &SourceMeta) -> Result<i64, RepositoryError> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO sources (source_type, external_id, title, created_at, last_updated)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(source_type, external_id) DO UPDATE SET
                title = excluded.title, last_updated = excluded.last_updated
            "#,
        )
        .bind(&meta.source_type)
        .bind(&meta.external_id)
        .bind(&meta.title)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        self.source_id(&meta.external_id).await
    }

    async fn replace_segments(
        &self,
        external_id: &str,
        segments: &[Segment],
    ) -> Result<(), RepositoryError> {
        let source_id = self.source_id(external_id).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        sqlx::query("DELETE FROM segments WHERE source_id = ?")
            .bind(source_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        for segment in segments {
            if !segment.is_well_formed() {
                return Err(RepositoryError::Conflict(format!(
                    "malformed segment in batch for '{external_id}': start={} end={}",
                    segment.start, segment.end
                )));
            }

            let embedding_json = segment
                .embedding
                .as_ref()
                .map(|e| serde_json::to_string(e).unwrap_or_default());
            let now = chrono::Utc::now().to_rfc3339();

            sqlx::query(
                r#"
                INSERT INTO segments (
                    source_id, start_sec, end_sec, text, text_hash, speaker_label,
                    speaker_confidence, avg_logprob, compression_ratio, no_speech_prob,
                    temperature_used, re_asr, is_overlap, needs_refinement, embedding, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(source_id)
            .bind(segment.start)
            .bind(segment.end)
            .bind(&segment.text)
            .bind(segment.text_hash())
            .bind(segment.speaker_label.as_str())
            .bind(segment.speaker_confidence)
            .bind(segment.metrics.avg_logprob)
            .bind(segment.metrics.compression_ratio)
            .bind(segment.metrics.no_speech_prob)
            .bind(segment.metrics.temperature_used)
            .bind(segment.re_asr)
            .bind(segment.is_overlap)
            .bind(segment.needs_refinement)
            .bind(&embedding_json)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(&e, external_id, segment))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn mark_status(
        &self,
        external_id: &str,
        status: &str,
        segments_count: u32,
        embeddings_count: u32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE sources SET status = ?, segments_count = ?, embeddings_count = ?, last_updated = ?
            WHERE external_id = ?
            "#,
        )
        .bind(status)
        .bind(i64::from(segments_count))
        .bind(i64::from(embeddings_count))
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(external_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("source '{external_id}'")));
        }
        Ok(())
    }

    async fn ensure_vector_index(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use ingest_core::{SegmentMetrics, SpeakerLabel};

    fn segment(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
            speaker_label: SpeakerLabel::Chaffee,
            speaker_confidence: Some(0.9),
            metrics: SegmentMetrics::default(),
            re_asr: false,
            is_overlap: false,
            needs_refinement: false,
            embedding: Some(vec![0.1, 0.2, 0.3]),
        }
    }

    #[tokio::test]
    async fn replace_segments_is_idempotent() {
        let pool = setup_test_database().await.unwrap();
        let store = SqliteSegmentStore::new(pool);

        let meta = SourceMeta::minimal("youtube", "abc123");
        store.upsert_source(&meta).await.unwrap();

        let segments = vec![segment(0.0, 1.0, "hello"), segment(1.0, 2.0, "world")];
        store.replace_segments("abc123", &segments).await.unwrap();
        store.replace_segments("abc123", &segments).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM segments")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count.0, 2);
    }

    #[tokio::test]
    async fn replace_segments_rejects_duplicate_natural_key_within_one_batch() {
        let pool = setup_test_database().await.unwrap();
        let store = SqliteSegmentStore::new(pool);
        store
            .upsert_source(&SourceMeta::minimal("youtube", "abc123"))
            .await
            .unwrap();

        let dup = vec![segment(0.0, 1.0, "hello"), segment(0.0, 1.0, "hello")];
        let result = store.replace_segments("abc123", &dup).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn replace_segments_rejects_malformed_batch() {
        let pool = setup_test_database().await.unwrap();
        let store = SqliteSegmentStore::new(pool);
        store
            .upsert_source(&SourceMeta::minimal("youtube", "abc123"))
            .await
            .unwrap();

        let bad = vec![segment(1.0, 1.0, "zero-length")];
        let result = store.replace_segments("abc123", &bad).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }
}
