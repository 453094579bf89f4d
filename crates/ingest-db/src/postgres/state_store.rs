//! Postgres implementation of the `StateStorePort` trait.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use ingest_core::{RepositoryError, Source, SourceMeta, SourceStatus, StateStorePort, StatusUpdate};

/// Postgres-backed implementation of `StateStorePort`.
///
/// Persists per-item processing state for durability across restarts and
/// as the authoritative dedup key on re-runs.
pub struct PostgresStateStore {
    pool: PgPool,
}

impl PostgresStateStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStorePort for PostgresStateStore {
    async fn upsert_source(&self, meta: &SourceMeta) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO sources (
                source_type, external_id, title, url, channel_name, channel_url,
                published_at, duration_s, view_count, like_count, comment_count,
                description, thumbnail_url, tags, metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (source_type, external_id) DO UPDATE SET
                title = excluded.title,
                url = excluded.url,
                channel_name = excluded.channel_name,
                channel_url = excluded.channel_url,
                published_at = excluded.published_at,
                duration_s = excluded.duration_s,
                view_count = excluded.view_count,
                like_count = excluded.like_count,
                comment_count = excluded.comment_count,
                description = excluded.description,
                thumbnail_url = excluded.thumbnail_url,
                tags = excluded.tags,
                metadata = excluded.metadata,
                last_updated = now()
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
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn get_state(
        &self,
        source_type: &str,
        external_id: &str,
    ) -> Result<Option<Source>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT source_type, external_id, title, url, channel_name, channel_url,
                   published_at, duration_s, view_count, like_count, comment_count,
                   description, thumbnail_url, tags, metadata,
                   status, retry_count, last_error, has_manual_captions, has_asr,
                   segments_count, embeddings_count, created_at, last_updated, processed_at
            FROM sources
            WHERE source_type = $1 AND external_id = $2
            "#,
        )
        .bind(source_type)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        row.map(|r| row_to_source(&r)).transpose()
    }

    async fn update_status(
        &self,
        source_type: &str,
        external_id: &str,
        new_status: SourceStatus,
        fields: StatusUpdate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE sources SET
                status = $1,
                retry_count = COALESCE($2, retry_count),
                last_error = COALESCE($3, last_error),
                has_manual_captions = COALESCE($4, has_manual_captions),
                has_asr = COALESCE($5, has_asr),
                segments_count = COALESCE($6, segments_count),
                embeddings_count = COALESCE($7, embeddings_count),
                last_updated = now(),
                processed_at = CASE WHEN $1 IN ('done', 'skipped') THEN now() ELSE processed_at END
            WHERE source_type = $8 AND external_id = $9
            "#,
        )
        .bind(new_status.as_str())
        .bind(fields.retry_count.map(i64::from))
        .bind(&fields.last_error)
        .bind(fields.has_manual_captions)
        .bind(fields.has_asr)
        .bind(fields.segments_count.map(i64::from))
        .bind(fields.embeddings_count.map(i64::from))
        .bind(source_type)
        .bind(external_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "source '{source_type}:{external_id}'"
            )));
        }

        Ok(())
    }

    async fn batch_check_exists(
        &self,
        ids: &[(String, String)],
    ) -> Result<HashMap<(String, String), SourceStatus>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let source_types: Vec<&str> = ids.iter().map(|(t, _)| t.as_str()).collect();
        let external_ids: Vec<&str> = ids.iter().map(|(_, e)| e.as_str()).collect();

        let rows = sqlx::query(
            r#"
            SELECT source_type, external_id, status
            FROM sources
            WHERE (source_type, external_id) IN (
                SELECT * FROM UNNEST($1::text[], $2::text[])
            )
            "#,
        )
        .bind(&source_types[..])
        .bind(&external_ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let source_type: String = row.try_get("source_type").map_err(map_column_error)?;
            let external_id: String = row.try_get("external_id").map_err(map_column_error)?;
            let status_str: String = row.try_get("status").map_err(map_column_error)?;
            out.insert((source_type, external_id), SourceStatus::parse(&status_str));
        }
        Ok(out)
    }
}

fn row_to_source(row: &sqlx::postgres::PgRow) -> Result<Source, RepositoryError> {
    let meta = SourceMeta {
        source_type: row.try_get("source_type").map_err(map_column_error)?,
        external_id: row.try_get("external_id").map_err(map_column_error)?,
        title: row.try_get("title").map_err(map_column_error)?,
        url: row.try_get("url").map_err(map_column_error)?,
        channel_name: row.try_get("channel_name").map_err(map_column_error)?,
        channel_url: row.try_get("channel_url").map_err(map_column_error)?,
        published_at: row.try_get("published_at").map_err(map_column_error)?,
        duration_s: row
            .try_get::<Option<i64>, _>("duration_s")
            .map_err(map_column_error)?
            .map(|v| v as u32),
        view_count: row
            .try_get::<Option<i64>, _>("view_count")
            .map_err(map_column_error)?
            .map(|v| v as u64),
        like_count: row
            .try_get::<Option<i64>, _>("like_count")
            .map_err(map_column_error)?
            .map(|v| v as u64),
        comment_count: row
            .try_get::<Option<i64>, _>("comment_count")
            .map_err(map_column_error)?
            .map(|v| v as u64),
        description: row.try_get("description").map_err(map_column_error)?,
        thumbnail_url: row.try_get("thumbnail_url").map_err(map_column_error)?,
        tags: row.try_get("tags").map_err(map_column_error)?,
        metadata: row.try_get("metadata").map_err(map_column_error)?,
    };

    let status_str: String = row.try_get("status").map_err(map_column_error)?;

    Ok(Source {
        meta,
        status: SourceStatus::parse(&status_str),
        retry_count: row
            .try_get::<i64, _>("retry_count")
            .map_err(map_column_error)? as u32,
        last_error: row.try_get("last_error").map_err(map_column_error)?,
        has_manual_captions: row
            .try_get("has_manual_captions")
            .map_err(map_column_error)?,
        has_asr: row.try_get("has_asr").map_err(map_column_error)?,
        segments_count: row
            .try_get::<i64, _>("segments_count")
            .map_err(map_column_error)? as u32,
        embeddings_count: row
            .try_get::<i64, _>("embeddings_count")
            .map_err(map_column_error)? as u32,
        created_at: row.try_get("created_at").map_err(map_column_error)?,
        last_updated: row.try_get("last_updated").map_err(map_column_error)?,
        processed_at: row.try_get("processed_at").map_err(map_column_error)?,
    })
}

fn map_column_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(format!("column read error: {e}"))
}
