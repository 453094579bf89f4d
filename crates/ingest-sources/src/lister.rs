//! Source Lister: a catalog-scraper back-end (CLI media-downloader in
//! flat-playlist/dump-json mode) and a catalog-API back-end (paginated HTTP).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use ingest_core::{IngestError, IngestResult, SourceListerFilters, SourceListerPort, SourceMeta};

use crate::process::run_capture;

const ENUMERATE_TIMEOUT: Duration = Duration::from_secs(300);
const SHORTS_MAX_DURATION_S: u32 = 120;

/// One row of the CLI media-downloader's `--dump-json` output. Field names
/// mirror that tool's schema, not ours; [`to_source_meta`] does the mapping.
#[derive(Debug, Deserialize)]
struct ScrapeItem {
    id: String,
    title: Option<String>,
    webpage_url: Option<String>,
    channel: Option<String>,
    channel_url: Option<String>,
    upload_date: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    like_count: Option<u64>,
    comment_count: Option<u64>,
    description: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    is_live: bool,
    #[serde(default)]
    was_live: bool,
    #[serde(default)]
    availability: Option<String>,
}

fn parse_upload_date(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::NaiveDate::parse_from_str(raw, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
}

fn to_source_meta(item: ScrapeItem, source_type: &str) -> SourceMeta {
    SourceMeta {
        source_type: source_type.to_string(),
        external_id: item.id,
        title: item.title,
        url: item.webpage_url,
        channel_name: item.channel,
        channel_url: item.channel_url,
        published_at: item.upload_date.as_deref().and_then(parse_upload_date),
        duration_s: item.duration.map(|d| d.round() as u32),
        view_count: item.view_count,
        like_count: item.like_count,
        comment_count: item.comment_count,
        description: item.description,
        thumbnail_url: item.thumbnail,
        tags: None,
        metadata: None,
    }
}

/// True if an enumerated item should be excluded by the configured filters.
fn is_filtered_scrape_item(item: &ScrapeItem, filters: &SourceListerFilters) -> bool {
    if filters.skip_shorts {
        if let Some(d) = item.duration {
            if d < f64::from(SHORTS_MAX_DURATION_S) {
                return true;
            }
        }
    }
    if let Some(max) = filters.max_duration_s {
        if let Some(d) = item.duration {
            if d > f64::from(max) {
                return true;
            }
        }
    }
    if filters.skip_live && item.is_live {
        return true;
    }
    if filters.skip_upcoming && item.availability.as_deref() == Some("upcoming") {
        return true;
    }
    if filters.skip_members_only && item.availability.as_deref() == Some("subscriber_only") {
        return true;
    }
    false
}

#[derive(Debug, Clone)]
pub struct ScrapeSourceListerConfig {
    /// Path to the CLI media-downloader binary (e.g. `yt-dlp`).
    pub binary: String,
    pub source_type: String,
}

impl Default for ScrapeSourceListerConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            source_type: "youtube".to_string(),
        }
    }
}

/// Lists a channel by shelling out to the CLI media-downloader in
/// flat-playlist, `--dump-json` mode. Each output line is one item's
/// metadata; enrichment failures for a single line degrade to
/// [`SourceMeta::minimal`] rather than failing the whole enumeration.
pub struct ScrapeSourceLister {
    config: ScrapeSourceListerConfig,
}

impl ScrapeSourceLister {
    #[must_use]
    pub fn new(config: ScrapeSourceListerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SourceListerPort for ScrapeSourceLister {
    async fn list(
        &self,
        channel_reference: &str,
        filters: &SourceListerFilters,
    ) -> IngestResult<Vec<SourceMeta>> {
        let stdout = run_capture(
            &self.config.binary,
            &[
                "--flat-playlist",
                "--dump-json",
                "--ignore-errors",
                channel_reference,
            ],
            ENUMERATE_TIMEOUT,
        )
        .await
        .map_err(|e| IngestError::Enumeration {
            message: e.to_string(),
        })?;

        let mut out = Vec::new();
        for (lineno, line) in stdout.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ScrapeItem>(line) {
                Ok(item) => {
                    if is_filtered_scrape_item(&item, filters) {
                        continue;
                    }
                    out.push(to_source_meta(item, &self.config.source_type));
                }
                Err(_) => {
                    tracing::warn!(lineno, "could not parse enumerated item, skipping");
                }
            }
        }

        if filters.newest_first {
            out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        }

        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct ApiSourceListerConfig {
    pub endpoint: String,
    pub api_key: String,
    pub source_type: String,
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
struct ApiListResponse {
    items: Vec<ScrapeItem>,
    next_page_token: Option<String>,
}

/// Lists a channel via a structured catalog API instead of the scraper.
/// Chosen over [`ScrapeSourceLister`] by `source_backend` in configuration.
pub struct ApiSourceLister {
    client: reqwest::Client,
    config: ApiSourceListerConfig,
}

impl ApiSourceLister {
    #[must_use]
    pub fn new(config: ApiSourceListerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn fetch_page(
        &self,
        channel_reference: &str,
        page_token: Option<&str>,
    ) -> IngestResult<ApiListResponse> {
        let mut request = self
            .client
            .get(format!("{}/channels/{channel_reference}/videos", self.config.endpoint))
            .bearer_auth(&self.config.api_key)
            .query(&[("page_size", self.config.page_size.to_string())]);

        if let Some(token) = page_token {
            request = request.query(&[("page_token", token)]);
        }

        let response = request.send().await.map_err(|e| IngestError::Enumeration {
            message: format!("catalog API request failed: {e}"),
        })?;

        if !response.status().is_success() {
            return Err(IngestError::Enumeration {
                message: format!("catalog API returned {}", response.status()),
            });
        }

        response.json().await.map_err(|e| IngestError::Enumeration {
            message: format!("malformed catalog API response: {e}"),
        })
    }
}

#[async_trait]
impl SourceListerPort for ApiSourceLister {
    async fn list(
        &self,
        channel_reference: &str,
        filters: &SourceListerFilters,
    ) -> IngestResult<Vec<SourceMeta>> {
        let mut out = Vec::new();
        let mut page_token = None;

        loop {
            let page = self.fetch_page(channel_reference, page_token.as_deref()).await?;
            for item in page.items {
                if is_filtered_scrape_item(&item, filters) {
                    continue;
                }
                out.push(to_source_meta(item, &self.config.source_type));
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        if filters.newest_first {
            out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(duration: f64) -> ScrapeItem {
        ScrapeItem {
            id: "abc".into(),
            title: Some("t".into()),
            webpage_url: None,
            channel: None,
            channel_url: None,
            upload_date: None,
            duration: Some(duration),
            view_count: None,
            like_count: None,
            comment_count: None,
            description: None,
            thumbnail: None,
            is_live: false,
            was_live: false,
            availability: None,
        }
    }

    #[test]
    fn skip_shorts_filters_under_two_minutes() {
        let filters = SourceListerFilters {
            skip_shorts: true,
            ..Default::default()
        };
        assert!(is_filtered_scrape_item(&item(59.0), &filters));
        assert!(!is_filtered_scrape_item(&item(121.0), &filters));
    }

    #[test]
    fn max_duration_filters_long_items() {
        let filters = SourceListerFilters {
            max_duration_s: Some(600),
            ..Default::default()
        };
        assert!(is_filtered_scrape_item(&item(700.0), &filters));
        assert!(!is_filtered_scrape_item(&item(500.0), &filters));
    }

    #[test]
    fn upload_date_parses_yyyymmdd() {
        let parsed = parse_upload_date("20240115").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d").to_string(), "2024-01-15");
    }
}
