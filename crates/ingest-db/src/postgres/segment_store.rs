//! Postgres implementation of the `SegmentStorePort` trait.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use ingest_core::{RepositoryError, Segment, SegmentStorePort, SourceMeta};

use crate::vector;

/// Postgres + pgvector implementation of `SegmentStorePort`.
///
/// `replace_segments` is the idempotence anchor: a crash between delete and
/// insert is survived by re-running the same call with the same segment set.
pub struct PostgresSegmentStore {
    pool: PgPool,
}

impl PostgresSegmentStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn source_id(&self, external_id: &str) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT id FROM sources WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        match row {
            Some(row) => row
                .try_get::<i64, _>("id")
                .map_err(|e| RepositoryError::Storage(e.to_string())),
            None => Err(RepositoryError::NotFound(format!(
                "source '{external_id}'"
            ))),
        }
    }
}

/// A unique-constraint hit on the natural key surfaces as a conflict so the
/// caller's retry-once-then-terminal policy can see it; any other failure
/// during the insert is an opaque storage error.
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
impl SegmentStorePort for PostgresSegmentStore {
    async fn upsert_source(&self, meta: &SourceMeta) -> Result<i64, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO sources (
                source_type, external_id, title, url, channel_name, channel_url,
                published_at, duration_s, view_count, like_count, comment_count,
                description, thumbnail_url, tags, metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (source_type, external_id) DO UPDATE SET
                title = excluded.title,
                last_updated = now()
            RETURNING id
            "#,
        )
        .bind(&meta.source_type)
        .bind(&meta.external_id)
        .bind(&meta.title)
        .bind(&meta.url)
        .bind(&meta.channel_name)
        .bind(&meta.channel_url)
        .bind(meta.published_at)
        .bind(meta.duration_s.map(i64::from))
        .bind(meta.view_count.map(|v| v as i64))
        .bind(meta.like_count.map(|v| v as i64))
        .bind(meta.comment_count.map(|v| v as i64))
        .bind(&meta.description)
        .bind(&meta.thumbnail_url)
        .bind(&meta.tags)
        .bind(&meta.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        row.try_get("id")
            .map_err(|e| RepositoryError::Storage(e.to_string()))
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

        sqlx::query("DELETE FROM segments WHERE source_id = $1")
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

            let embedding_literal = segment.embedding.as_deref().map(vector::encode);

            sqlx::query(
                r#"
                INSERT INTO segments (
                    source_id, start_sec, end_sec, text, text_hash, speaker_label,
                    speaker_confidence, avg_logprob, compression_ratio, no_speech_prob,
                    temperature_used, re_asr, is_overlap, needs_refinement, embedding
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15::vector)
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
            .bind(embedding_literal)
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
            UPDATE sources SET
                status = $1,
                segments_count = $2,
                embeddings_count = $3,
                last_updated = now(),
                processed_at = CASE WHEN $1 IN ('done', 'skipped') THEN now() ELSE processed_at END
            WHERE external_id = $4
            "#,
        )
        .bind(status)
        .bind(i64::from(segments_count))
        .bind(i64::from(embeddings_count))
        .bind(external_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "source '{external_id}'"
            )));
        }

        Ok(())
    }

    async fn ensure_vector_index(&self) -> Result<(), RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM segments WHERE embedding IS NOT NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let row_count: i64 = row.try_get("n").map_err(|e| RepositoryError::Storage(e.to_string()))?;

        // ivfflat's recommended list count scales with row volume; `100` is
        // the floor recommended for small/warming-up datasets.
        #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let lists = ((row_count as f64).sqrt().round() as i64).max(100);

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS segments_embedding_idx ON segments \
             USING ivfflat (embedding vector_l2_ops) WITH (lists = {lists})"
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(())
    }
}
