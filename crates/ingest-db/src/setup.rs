//! Database setup and initialization.
//!
//! Provides `setup_database()` for initializing the Postgres schema behind
//! the State Store and Segment Store. Entry points call this once
//! with the resolved connection string before constructing repositories.

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connects to Postgres and ensures the schema exists.
///
/// `embedding_dimension` is baked into the `segments.embedding` column at
/// creation time (pgvector requires a fixed dimension per column); it must
/// match the deployment's `IngestConfig::embedding_dimension` for the
/// lifetime of the database.
///
/// # Errors
/// Returns an error if the connection cannot be established or schema
/// creation fails.
pub async fn setup_database(database_url: &str, embedding_dimension: usize) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await?;

    create_schema(&pool, embedding_dimension).await?;

    Ok(pool)
}

async fn create_schema(pool: &PgPool, embedding_dimension: usize) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id BIGSERIAL PRIMARY KEY,
            source_type TEXT NOT NULL,
            external_id TEXT NOT NULL,
            title TEXT,
            url TEXT,
            channel_name TEXT,
            channel_url TEXT,
            published_at TIMESTAMPTZ,
            duration_s INTEGER,
            view_count BIGINT,
            like_count BIGINT,
            comment_count BIGINT,
            description TEXT,
            thumbnail_url TEXT,
            tags JSONB,
            metadata JSONB,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            has_manual_captions BOOLEAN NOT NULL DEFAULT FALSE,
            has_asr BOOLEAN NOT NULL DEFAULT FALSE,
            segments_count INTEGER NOT NULL DEFAULT 0,
            embeddings_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            last_updated TIMESTAMPTZ NOT NULL DEFAULT now(),
            processed_at TIMESTAMPTZ,
            UNIQUE(source_type, external_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sources_status ON sources(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sources_updated ON sources(last_updated)")
        .execute(pool)
        .await?;

    // The embedding column's dimension is fixed at creation; pgvector
    // rejects inserts of a different length at the engine level.
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS segments (
            id BIGSERIAL PRIMARY KEY,
            source_id BIGINT NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
            start_sec DOUBLE PRECISION NOT NULL,
            end_sec DOUBLE PRECISION NOT NULL,
            text TEXT NOT NULL,
            text_hash TEXT NOT NULL,
            speaker_label TEXT NOT NULL,
            speaker_confidence DOUBLE PRECISION,
            avg_logprob DOUBLE PRECISION,
            compression_ratio DOUBLE PRECISION,
            no_speech_prob DOUBLE PRECISION,
            temperature_used DOUBLE PRECISION,
            re_asr BOOLEAN NOT NULL DEFAULT FALSE,
            is_overlap BOOLEAN NOT NULL DEFAULT FALSE,
            needs_refinement BOOLEAN NOT NULL DEFAULT FALSE,
            embedding vector({embedding_dimension}),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE(source_id, start_sec, end_sec, text_hash)
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_segments_source_id ON segments(source_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_segments_speaker ON segments(speaker_label)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_segments_time ON segments(source_id, start_sec)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// In-memory SQLite schema used by the repository test doubles. Mirrors
/// the Postgres shape closely enough to exercise the same query logic,
/// minus the vector column: embeddings round-trip as a JSON text blob.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<sqlx::SqlitePool> {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await?;

    sqlx::query(
        r#"
        CREATE TABLE sources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_type TEXT NOT NULL,
            external_id TEXT NOT NULL,
            title TEXT,
            url TEXT,
            channel_name TEXT,
            channel_url TEXT,
            published_at TEXT,
            duration_s INTEGER,
            view_count INTEGER,
            like_count INTEGER,
            comment_count INTEGER,
            description TEXT,
            thumbnail_url TEXT,
            tags TEXT,
            metadata TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            has_manual_captions INTEGER NOT NULL DEFAULT 0,
            has_asr INTEGER NOT NULL DEFAULT 0,
            segments_count INTEGER NOT NULL DEFAULT 0,
            embeddings_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_updated TEXT NOT NULL,
            processed_at TEXT,
            UNIQUE(source_type, external_id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE segments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
            start_sec REAL NOT NULL,
            end_sec REAL NOT NULL,
            text TEXT NOT NULL,
            text_hash TEXT NOT NULL,
            speaker_label TEXT NOT NULL,
            speaker_confidence REAL,
            avg_logprob REAL,
            compression_ratio REAL,
            no_speech_prob REAL,
            temperature_used REAL,
            re_asr INTEGER NOT NULL DEFAULT 0,
            is_overlap INTEGER NOT NULL DEFAULT 0,
            needs_refinement INTEGER NOT NULL DEFAULT 0,
            embedding TEXT,
            created_at TEXT NOT NULL,
            UNIQUE(source_id, start_sec, end_sec, text_hash)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_test_database() {
        let pool = setup_test_database().await.unwrap();

        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sources")
            .fetch_one(&pool)
            .await
            .unwrap();
        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM segments")
            .fetch_one(&pool)
            .await
            .unwrap();
    }
}
