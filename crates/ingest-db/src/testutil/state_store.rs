//! `SQLite` test double for `StateStorePort`.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use ingest_core::{RepositoryError, Source, SourceMeta, SourceStatus, StateStorePort, StatusUpdate};

pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStorePort for SqliteStateStore {
    async fn upsert_source(&self, meta: &SourceMeta) -> Result<(), RepositoryError> {
        let tags = meta.tags.as_ref().map(serde_json::Value::to_string);
        let metadata = meta.metadata.as_ref().map(serde_json::Value::to_string);
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO sources (
                source_type, external_id, title, url, channel_name, channel_url,
                published_at, duration_s, view_count, like_count, comment_count,
                description, thumbnail_url, tags, metadata, created_at, last_updated
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_type, external_id) DO UPDATE SET
                title = excluded.title,
                url = excluded.url,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&meta.source_type)
        .bind(&meta.external_id)
        .bind(&meta.title)
        .bind(&meta.url)
        .bind(&meta.channel_name)
        .bind(&meta.channel_url)
        .bind(meta.published_at.map(|t| t.to_rfc3339()))
        .bind(meta.duration_s.map(i64::from))
        .bind(meta.view_count.map(|v| v as i64))
        .bind(meta.like_count.map(|v| v as i64))
        .bind(meta.comment_count.map(|v| v as i64))
        .bind(&meta.description)
        .bind(&meta.thumbnail_url)
        .bind(&tags)
        .bind(&metadata)
        .bind(&now)
        .bind(&now)
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
            "SELECT * FROM sources WHERE source_type = ? AND external_id = ?",
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
        let processed_at = new_status.is_terminal().then(|| chrono::Utc::now().to_rfc3339());

        let result = sqlx::query(
            r#"
            UPDATE sources SET
                status = ?,
                retry_count = COALESCE(?, retry_count),
                last_error = COALESCE(?, last_error),
                has_manual_captions = COALESCE(?, has_manual_captions),
                has_asr = COALESCE(?, has_asr),
                segments_count = COALESCE(?, segments_count),
                embeddings_count = COALESCE(?, embeddings_count),
                last_updated = ?,
                processed_at = COALESCE(?, processed_at)
            WHERE source_type = ? AND external_id = ?
            "#,
        )
        .bind(new_status.as_str())
        .bind(fields.retry_count.map(i64::from))
        .bind(&fields.last_error)
        .bind(fields.has_manual_captions)
        .bind(fields.has_asr)
        .bind(fields.segments_count.map(i64::from))
        .bind(fields.embeddings_count.map(i64::from))
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&processed_at)
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
        let mut out = HashMap::with_capacity(ids.len());
        for (source_type, external_id) in ids {
            if let Some(source) = self.get_state(source_type, external_id).await? {
                out.insert((source_type.clone(), external_id.clone()), source.status);
            }
        }
        Ok(out)
    }
}

fn row_to_source(row: &sqlx::sqlite::SqliteRow) -> Result<Source, RepositoryError> {
    let meta = SourceMeta {
        source_type: row.try_get("source_type").map_err(map_column_error)?,
        external_id: row.try_get("external_id").map_err(map_column_error)?,
        title: row.try_get("title").map_err(map_column_error)?,
        url: row.try_get("url").map_err(map_column_error)?,
        channel_name: row.try_get("channel_name").map_err(map_column_error)?,
        channel_url: row.try_get("channel_url").map_err(map_column_error)?,
        published_at: row
            .try_get::<Option<String>, _>("published_at")
            .map_err(map_column_error)?
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&chrono::Utc)),
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
        tags: row
            .try_get::<Option<String>, _>("tags")
            .map_err(map_column_error)?
            .and_then(|s| serde_json::from_str(&s).ok()),
        metadata: row
            .try_get::<Option<String>, _>("metadata")
            .map_err(map_column_error)?
            .and_then(|s| serde_json::from_str(&s).ok()),
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
            .try_get::<i64, _>("has_manual_captions")
            .map_err(map_column_error)?
            != 0,
        has_asr: row.try_get::<i64, _>("has_asr").map_err(map_column_error)? != 0,
        segments_count: row
            .try_get::<i64, _>("segments_count")
            .map_err(map_column_error)? as u32,
        embeddings_count: row
            .try_get::<i64, _>("embeddings_count")
            .map_err(map_column_error)? as u32,
        created_at: parse_ts(row, "created_at")?,
        last_updated: parse_ts(row, "last_updated")?,
        processed_at: row
            .try_get::<Option<String>, _>("processed_at")
            .map_err(map_column_error)?
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&chrono::Utc)),
    })
}

fn parse_ts(row: &sqlx::sqlite::SqliteRow, col: &str) -> Result<chrono::DateTime<chrono::Utc>, RepositoryError> {
    let s: String = row.try_get(col).map_err(map_column_error)?;
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|t| t.with_timezone(&chrono::Utc))
        .map_err(|e| RepositoryError::Storage(format!("timestamp parse error in {col}: {e}")))
}

fn map_column_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(format!("column read error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let pool = setup_test_database().await.unwrap();
        let store = SqliteStateStore::new(pool);

        let meta = SourceMeta::minimal("youtube", "abc123");
        store.upsert_source(&meta).await.unwrap();

        let found = store.get_state("youtube", "abc123").await.unwrap().unwrap();
        assert_eq!(found.meta.external_id, "abc123");
        assert_eq!(found.status, SourceStatus::Pending);
    }

    #[tokio::test]
    async fn update_status_on_missing_source_errors() {
        let pool = setup_test_database().await.unwrap();
        let store = SqliteStateStore::new(pool);

        let result = store
            .update_status("youtube", "missing", SourceStatus::Done, StatusUpdate::default())
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn batch_check_exists_reports_known_statuses() {
        let pool = setup_test_database().await.unwrap();
        let store = SqliteStateStore::new(pool);

        store
            .upsert_source(&SourceMeta::minimal("youtube", "one"))
            .await
            .unwrap();

        let result = store
            .batch_check_exists(&[
                ("youtube".to_string(), "one".to_string()),
                ("youtube".to_string(), "two".to_string()),
            ])
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(
            result.get(&("youtube".to_string(), "one".to_string())),
            Some(&SourceStatus::Pending)
        );
    }
}
