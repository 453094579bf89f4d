use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Which Source Lister backend to use for catalog discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceBackend {
    /// Screen-scraped catalog listing, no API key required.
    Scrape,
    /// Catalog API, quota-metered and requires `api_key`.
    Api,
}

impl FromStr for SourceBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scrape" => Ok(Self::Scrape),
            "api" => Ok(Self::Api),
            other => Err(ConfigError::Invalid {
                key: "source_backend".into(),
                reason: format!("unknown backend '{other}', expected scrape|api"),
            }),
        }
    }
}

/// Thresholds that route a segment to the refinement pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AsrQualityThresholds {
    pub min_avg_logprob: f32,
    pub max_compression_ratio: f32,
    pub max_no_speech_prob: f32,
}

impl Default for AsrQualityThresholds {
    fn default() -> Self {
        Self {
            min_avg_logprob: -1.0,
            max_compression_ratio: 2.4,
            max_no_speech_prob: 0.6,
        }
    }
}

/// Validated, immutable snapshot of every tunable the pipeline reads.
/// One instance is built once at process startup and shared read-only
/// (`Arc<IngestConfig>`) across every pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub database_url: String,
    pub source_backend: SourceBackend,
    pub api_key: Option<String>,
    pub channel_reference: String,

    pub storage_dir: PathBuf,
    pub store_audio_locally: bool,
    pub production_mode: bool,

    pub n_io: usize,
    pub n_asr: usize,
    pub n_db: usize,
    pub batch_embed_size: usize,

    pub whisper_model_primary: String,
    pub whisper_model_refine: String,
    pub asr_quality_thresholds: AsrQualityThresholds,

    pub target_min_chars: usize,
    pub target_max_chars: usize,
    pub max_gap_s: f64,
    pub max_merge_s: f64,

    pub embedding_dimension: usize,
    pub embed_target_only: bool,

    pub skip_shorts: bool,
    pub max_duration_s: Option<u64>,
    pub skip_live: bool,
    pub skip_upcoming: bool,
    pub skip_members_only: bool,
    pub force_reprocess: bool,

    pub retry_max: u32,
    pub backoff_base_ms: u64,

    pub voice_profile_name: String,
    pub voice_profile_dir: PathBuf,
    pub chaffee_min_sim: f64,

    pub medical_grade_captions: bool,
    pub monologue_assumption: bool,

    pub max_cost_per_run: Option<f64>,
    pub remote_asr_rate_per_min: Option<u32>,

    pub cancel_on_sigint: bool,

    pub log_format: LogFormat,
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid {
                key: "log_format".into(),
                reason: format!("unknown format '{other}', expected pretty|json"),
            }),
        }
    }
}

impl IngestConfig {
    /// Cross-field checks that a loader cannot express in per-key parsing
    /// alone. Called once after every key has been resolved.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_min_chars >= self.target_max_chars {
            return Err(ConfigError::Invalid {
                key: "target_min_chars".into(),
                reason: "must be less than target_max_chars".into(),
            });
        }
        if self.n_io == 0 || self.n_asr == 0 || self.n_db == 0 {
            return Err(ConfigError::Invalid {
                key: "n_io|n_asr|n_db".into(),
                reason: "worker pool sizes must be non-zero".into(),
            });
        }
        if self.embedding_dimension == 0 {
            return Err(ConfigError::Invalid {
                key: "embedding_dimension".into(),
                reason: "must be non-zero".into(),
            });
        }
        if self.source_backend == SourceBackend::Api && self.api_key.is_none() {
            return Err(ConfigError::Missing("api_key".into()));
        }
        if !(0.0..=1.0).contains(&self.chaffee_min_sim) {
            return Err(ConfigError::Invalid {
                key: "chaffee_min_sim".into(),
                reason: "must be within [0.0, 1.0]".into(),
            });
        }
        Ok(())
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IngestConfig {
        IngestConfig {
            database_url: "postgres://localhost/ingest".into(),
            source_backend: SourceBackend::Scrape,
            api_key: None,
            channel_reference: "UCexample".into(),
            storage_dir: PathBuf::from("/tmp/ingest"),
            store_audio_locally: false,
            production_mode: false,
            n_io: 12,
            n_asr: 2,
            n_db: 4,
            batch_embed_size: 64,
            whisper_model_primary: "medium.en".into(),
            whisper_model_refine: "large-v3".into(),
            asr_quality_thresholds: AsrQualityThresholds::default(),
            target_min_chars: 120,
            target_max_chars: 300,
            max_gap_s: 2.0,
            max_merge_s: 30.0,
            embedding_dimension: 1536,
            embed_target_only: true,
            skip_shorts: true,
            max_duration_s: None,
            skip_live: true,
            skip_upcoming: true,
            skip_members_only: false,
            force_reprocess: false,
            retry_max: 3,
            backoff_base_ms: 500,
            voice_profile_name: "target".into(),
            voice_profile_dir: PathBuf::from("/tmp/voices"),
            chaffee_min_sim: 0.62,
            medical_grade_captions: false,
            monologue_assumption: true,
            max_cost_per_run: None,
            remote_asr_rate_per_min: None,
            cancel_on_sigint: true,
            log_format: LogFormat::Pretty,
            log_level: "info".into(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn char_window_must_be_ordered() {
        let mut cfg = sample();
        cfg.target_min_chars = 400;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn api_backend_requires_key() {
        let mut cfg = sample();
        cfg.source_backend = SourceBackend::Api;
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(k)) if k == "api_key"));
    }

    #[test]
    fn similarity_threshold_is_bounded() {
        let mut cfg = sample();
        cfg.chaffee_min_sim = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn source_backend_parses() {
        assert_eq!("scrape".parse::<SourceBackend>().unwrap(), SourceBackend::Scrape);
        assert!("bogus".parse::<SourceBackend>().is_err());
    }
}
