//! Caption Fetcher: a structured-API lookup first, falling back to
//! subtitle extraction via the same CLI media-downloader used by the Audio
//! Acquirer, per the fallback ladder.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use ingest_core::{Caption, CaptionFetcherPort, CaptionOutcome, CaptionSet, IngestResult};

use crate::process::run_capture;
use crate::vtt::parse_vtt;

const SUBTITLE_TIMEOUT: Duration = Duration::from_secs(300);
const MIN_CAPTION_CHARS: usize = 2;
const MERGE_GAP_S: f64 = 1.0;

const NON_VERBAL_MARKERS: &[&str] = &["[music]", "[applause]", "[laughter]", "[silence]"];

#[derive(Debug, Clone)]
pub struct CaptionFetcherConfig {
    /// Base URL of a structured captions API; `None` disables rung 1.
    pub structured_api_endpoint: Option<String>,
    pub structured_api_key: Option<String>,
    pub downloader_binary: String,
    /// Rejects auto-generated tracks outright (default on).
    pub medical_grade: bool,
    pub scratch_dir: PathBuf,
}

impl Default for CaptionFetcherConfig {
    fn default() -> Self {
        Self {
            structured_api_endpoint: None,
            structured_api_key: None,
            downloader_binary: "yt-dlp".to_string(),
            medical_grade: true,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StructuredApiCaption {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct StructuredApiResponse {
    captions: Vec<StructuredApiCaption>,
    auto_generated: bool,
    language: String,
}

pub struct FallbackCaptionFetcher {
    client: reqwest::Client,
    config: CaptionFetcherConfig,
}

impl FallbackCaptionFetcher {
    #[must_use]
    pub fn new(config: CaptionFetcherConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn try_structured_api(
        &self,
        external_id: &str,
        language_prefs: &[String],
    ) -> Option<(CaptionSet, bool)> {
        let endpoint = self.config.structured_api_endpoint.as_ref()?;
        let lang = language_prefs.first().map(String::as_str).unwrap_or("en");

        let mut request = self
            .client
            .get(format!("{endpoint}/captions/{external_id}"))
            .query(&[("lang", lang)]);
        if let Some(key) = &self.config.structured_api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let parsed: StructuredApiResponse = response.json().await.ok()?;
        if parsed.captions.is_empty() {
            return None;
        }

        let captions = parsed
            .captions
            .into_iter()
            .map(|c| Caption {
                start: c.start,
                end: c.end,
                text: c.text,
            })
            .collect();

        Some((
            CaptionSet {
                captions,
                auto_generated: parsed.auto_generated,
                language: parsed.language,
            },
            parsed.auto_generated,
        ))
    }

    async fn try_subtitle_extraction(
        &self,
        external_id: &str,
        language_prefs: &[String],
        want_auto: bool,
    ) -> Option<(CaptionSet, bool)> {
        let lang = language_prefs.first().map(String::as_str).unwrap_or("en");
        let out_path = self
            .config
            .scratch_dir
            .join(format!("{external_id}.{lang}.vtt"));
        let url = format!("https://www.youtube.com/watch?v={external_id}");

        let sub_flag = if want_auto {
            "--write-auto-sub"
        } else {
            "--write-sub"
        };

        let args = [
            url.as_str(),
            "--skip-download",
            sub_flag,
            "--sub-lang",
            lang,
            "--sub-format",
            "vtt",
            "--convert-subs",
            "vtt",
            "-o",
            out_path.with_extension("").to_string_lossy().as_ref(),
        ];

        if run_capture(&self.config.downloader_binary, &args, SUBTITLE_TIMEOUT)
            .await
            .is_err()
        {
            return None;
        }

        let contents = tokio::fs::read_to_string(&out_path).await.ok()?;
        let _ = tokio::fs::remove_file(&out_path).await;
        let captions = parse_vtt(&contents);
        if captions.is_empty() {
            return None;
        }

        Some((
            CaptionSet {
                captions,
                auto_generated: want_auto,
                language: lang.to_string(),
            },
            want_auto,
        ))
    }
}

/// Drops non-verbal markers and sub-`MIN_CAPTION_CHARS` fragments, then
/// merges adjacent cues whose gap is within `MERGE_GAP_S`.
pub(crate) fn normalize_captions(captions: Vec<Caption>) -> Vec<Caption> {
    let filtered: Vec<Caption> = captions
        .into_iter()
        .filter(|c| c.text.trim().len() > MIN_CAPTION_CHARS)
        .filter(|c| {
            let lower = c.text.to_lowercase();
            !NON_VERBAL_MARKERS.iter().any(|m| lower.contains(m))
        })
        .collect();

    let mut merged: Vec<Caption> = Vec::with_capacity(filtered.len());
    for caption in filtered {
        match merged.last_mut() {
            Some(prev) if caption.start - prev.end <= MERGE_GAP_S => {
                prev.end = caption.end;
                prev.text.push(' ');
                prev.text.push_str(&caption.text);
            }
            _ => merged.push(caption),
        }
    }
    merged
}

#[async_trait]
impl CaptionFetcherPort for FallbackCaptionFetcher {
    async fn fetch(
        &self,
        external_id: &str,
        language_prefs: &[String],
    ) -> IngestResult<(CaptionOutcome, Option<CaptionSet>)> {
        if let Some((mut set, auto_generated)) =
            self.try_structured_api(external_id, language_prefs).await
        {
            if !(self.config.medical_grade && auto_generated) {
                set.captions = normalize_captions(set.captions);
                if !set.captions.is_empty() {
                    return Ok((CaptionOutcome::Found, Some(set)));
                }
            } else {
                return Ok((CaptionOutcome::OnlyAutoGeneratedRejected, None));
            }
        }

        if let Some((mut set, _)) = self
            .try_subtitle_extraction(external_id, language_prefs, false)
            .await
        {
            set.captions = normalize_captions(set.captions);
            if !set.captions.is_empty() {
                return Ok((CaptionOutcome::Found, Some(set)));
            }
        }

        if self.config.medical_grade {
            return Ok((CaptionOutcome::NoTrackAvailable, None));
        }

        if let Some((mut set, _)) = self
            .try_subtitle_extraction(external_id, language_prefs, true)
            .await
        {
            set.captions = normalize_captions(set.captions);
            if !set.captions.is_empty() {
                return Ok((CaptionOutcome::Found, Some(set)));
            }
        }

        Ok((CaptionOutcome::NoTrackAvailable, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(start: f64, end: f64, text: &str) -> Caption {
        Caption {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn drops_non_verbal_markers_and_short_fragments() {
        let input = vec![cap(0.0, 1.0, "[music]"), cap(1.0, 2.0, "ok"), cap(2.0, 3.0, "Hello there")];
        let out = normalize_captions(input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Hello there");
    }

    #[test]
    fn merges_gaps_within_one_second() {
        let input = vec![cap(0.0, 1.0, "Hello"), cap(1.5, 2.0, "world")];
        let out = normalize_captions(input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Hello world");
        assert!((out[0].end - 2.0).abs() < 1e-9);
    }

    #[test]
    fn does_not_merge_gaps_beyond_threshold() {
        let input = vec![cap(0.0, 1.0, "Hello"), cap(3.0, 4.0, "world")];
        let out = normalize_captions(input);
        assert_eq!(out.len(), 2);
    }
}
