//! Configuration Loader front door: layers defaults, an optional JSON file,
//! the process environment, and explicit CLI overrides into one validated
//! [`IngestConfig`]. `ingest-core::config` owns the shape and the
//! cross-field validation; this module owns the layering itself, since the
//! core crate does not parse arguments or read the environment.

use std::path::{Path, PathBuf};

use ingest_core::{AsrQualityThresholds, ConfigError, IngestConfig, LogFormat, SourceBackend};

/// Pre-parsed CLI-supplied overrides, the highest-precedence layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub channel_reference: Option<String>,
    pub database_url: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub force_reprocess: Option<bool>,
    pub max_cost_per_run: Option<f64>,
}

/// Lowest-precedence defaults for every key that has one. Keys absent here
/// are required: missing from every layer is a `ConfigError::Missing`.
fn defaults() -> serde_json::Value {
    serde_json::json!({
        "source_backend": "scrape",
        "storage_dir": "./ingest-storage",
        "store_audio_locally": false,
        "production_mode": false,
        "n_io": 12,
        "n_asr": 2,
        "n_db": 4,
        "batch_embed_size": 64,
        "whisper_model_primary": "medium.en",
        "whisper_model_refine": "large-v3",
        "asr_min_avg_logprob": -1.0,
        "asr_max_compression_ratio": 2.4,
        "asr_max_no_speech_prob": 0.6,
        "target_min_chars": 120,
        "target_max_chars": 300,
        "max_gap_s": 2.0,
        "max_merge_s": 30.0,
        "embedding_dimension": 1536,
        "embed_target_only": true,
        "skip_shorts": true,
        "skip_live": true,
        "skip_upcoming": true,
        "skip_members_only": false,
        "force_reprocess": false,
        "retry_max": 3,
        "backoff_base_ms": 500,
        "voice_profile_name": "target",
        "chaffee_min_sim": 0.62,
        "medical_grade_captions": true,
        "monologue_assumption": false,
        "cancel_on_sigint": true,
        "log_format": "pretty",
        "log_level": "info",
    })
}

fn read_file_layer(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let bytes = std::fs::read(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e.into(),
    })
}

/// Resolves one key across the three layers, lowest to highest precedence:
/// built-in defaults, the optional file, the environment, nothing left for
/// CLI overrides here since those are applied per-field by the caller.
fn resolve(key: &str, defaults: &serde_json::Value, file: &serde_json::Value, env_key: &str) -> Option<String> {
    if let Ok(v) = std::env::var(env_key) {
        return Some(v);
    }
    if let Some(v) = file.get(key) {
        return Some(value_to_string(v));
    }
    defaults.get(key).map(value_to_string)
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_bool(s: &str, key: &str) -> Result<bool, ConfigError> {
    match s {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("expected true|false, got '{other}'"),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(s: &str, key: &str) -> Result<T, ConfigError> {
    s.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        reason: format!("could not parse '{s}' as a number"),
    })
}

/// Loads and validates the configuration. `file_path` is the optional JSON
/// config file; `overrides` is applied last.
///
/// # Errors
/// `ConfigError::Missing` if a required key resolves to nothing in any
/// layer; `ConfigError::Invalid` if a resolved value is outside its
/// documented domain; `ConfigError::Io`/`Parse` if `file_path` is given but
/// unreadable or malformed.
pub fn load_config(file_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<IngestConfig, ConfigError> {
    let defaults = defaults();
    let file = match file_path {
        Some(p) => read_file_layer(p)?,
        None => serde_json::Value::Null,
    };

    let database_url = overrides.database_url.clone().or_else(|| {
        resolve("database_url", &defaults, &file, "DATABASE_URL")
    }).ok_or_else(|| ConfigError::Missing("database_url".into()))?;

    let channel_reference = overrides.channel_reference.clone().or_else(|| {
        resolve("channel_reference", &defaults, &file, "INGEST_CHANNEL_REFERENCE")
    }).ok_or_else(|| ConfigError::Missing("channel_reference".into()))?;

    let voice_profile_dir: PathBuf = resolve("voice_profile_dir", &defaults, &file, "INGEST_VOICE_PROFILE_DIR")
        .ok_or_else(|| ConfigError::Missing("voice_profile_dir".into()))?
        .into();

    let source_backend_raw = resolve("source_backend", &defaults, &file, "INGEST_SOURCE_BACKEND")
        .ok_or_else(|| ConfigError::Missing("source_backend".into()))?;
    let source_backend: SourceBackend = source_backend_raw.parse()?;

    let api_key = resolve("api_key", &defaults, &file, "INGEST_API_KEY");

    let storage_dir: PathBuf = overrides
        .storage_dir
        .clone()
        .or_else(|| resolve("storage_dir", &defaults, &file, "INGEST_STORAGE_DIR").map(PathBuf::from))
        .ok_or_else(|| ConfigError::Missing("storage_dir".into()))?;

    let production_mode = parse_bool(
        &resolve("production_mode", &defaults, &file, "INGEST_PRODUCTION_MODE")
            .ok_or_else(|| ConfigError::Missing("production_mode".into()))?,
        "production_mode",
    )?;

    let mut store_audio_locally = parse_bool(
        &resolve("store_audio_locally", &defaults, &file, "INGEST_STORE_AUDIO_LOCALLY")
            .ok_or_else(|| ConfigError::Missing("store_audio_locally".into()))?,
        "store_audio_locally",
    )?;
    if production_mode {
        store_audio_locally = false;
    }

    let log_format_raw = resolve("log_format", &defaults, &file, "INGEST_LOG_FORMAT")
        .ok_or_else(|| ConfigError::Missing("log_format".into()))?;
    let log_format: LogFormat = log_format_raw.parse()?;

    let log_level = resolve("log_level", &defaults, &file, "INGEST_LOG_LEVEL")
        .ok_or_else(|| ConfigError::Missing("log_level".into()))?;

    macro_rules! req_num {
        ($key:literal, $env:literal) => {
            parse_num(
                &resolve($key, &defaults, &file, $env).ok_or_else(|| ConfigError::Missing($key.into()))?,
                $key,
            )?
        };
    }
    macro_rules! req_bool {
        ($key:literal, $env:literal) => {
            parse_bool(
                &resolve($key, &defaults, &file, $env).ok_or_else(|| ConfigError::Missing($key.into()))?,
                $key,
            )?
        };
    }
    macro_rules! opt_num {
        ($key:literal, $env:literal) => {
            resolve($key, &defaults, &file, $env).map(|s| parse_num(&s, $key)).transpose()?
        };
    }

    let config = IngestConfig {
        database_url,
        source_backend,
        api_key,
        channel_reference,
        storage_dir,
        store_audio_locally,
        production_mode,
        n_io: req_num!("n_io", "INGEST_N_IO"),
        n_asr: req_num!("n_asr", "INGEST_N_ASR"),
        n_db: req_num!("n_db", "INGEST_N_DB"),
        batch_embed_size: req_num!("batch_embed_size", "INGEST_BATCH_EMBED_SIZE"),
        whisper_model_primary: resolve("whisper_model_primary", &defaults, &file, "INGEST_WHISPER_MODEL_PRIMARY")
            .ok_or_else(|| ConfigError::Missing("whisper_model_primary".into()))?,
        whisper_model_refine: resolve("whisper_model_refine", &defaults, &file, "INGEST_WHISPER_MODEL_REFINE")
            .ok_or_else(|| ConfigError::Missing("whisper_model_refine".into()))?,
        asr_quality_thresholds: AsrQualityThresholds {
            min_avg_logprob: req_num!("asr_min_avg_logprob", "INGEST_ASR_MIN_AVG_LOGPROB"),
            max_compression_ratio: req_num!("asr_max_compression_ratio", "INGEST_ASR_MAX_COMPRESSION_RATIO"),
            max_no_speech_prob: req_num!("asr_max_no_speech_prob", "INGEST_ASR_MAX_NO_SPEECH_PROB"),
        },
        target_min_chars: req_num!("target_min_chars", "INGEST_TARGET_MIN_CHARS"),
        target_max_chars: req_num!("target_max_chars", "INGEST_TARGET_MAX_CHARS"),
        max_gap_s: req_num!("max_gap_s", "INGEST_MAX_GAP_S"),
        max_merge_s: req_num!("max_merge_s", "INGEST_MAX_MERGE_S"),
        embedding_dimension: req_num!("embedding_dimension", "INGEST_EMBEDDING_DIMENSION"),
        embed_target_only: req_bool!("embed_target_only", "INGEST_EMBED_TARGET_ONLY"),
        skip_shorts: req_bool!("skip_shorts", "INGEST_SKIP_SHORTS"),
        max_duration_s: opt_num!("max_duration_s", "INGEST_MAX_DURATION_S"),
        skip_live: req_bool!("skip_live", "INGEST_SKIP_LIVE"),
        skip_upcoming: req_bool!("skip_upcoming", "INGEST_SKIP_UPCOMING"),
        skip_members_only: req_bool!("skip_members_only", "INGEST_SKIP_MEMBERS_ONLY"),
        force_reprocess: overrides.force_reprocess.unwrap_or(req_bool!("force_reprocess", "INGEST_FORCE_REPROCESS")),
        retry_max: req_num!("retry_max", "INGEST_RETRY_MAX"),
        backoff_base_ms: req_num!("backoff_base_ms", "INGEST_BACKOFF_BASE_MS"),
        voice_profile_name: resolve("voice_profile_name", &defaults, &file, "INGEST_VOICE_PROFILE_NAME")
            .ok_or_else(|| ConfigError::Missing("voice_profile_name".into()))?,
        voice_profile_dir,
        chaffee_min_sim: req_num!("chaffee_min_sim", "INGEST_CHAFFEE_MIN_SIM"),
        medical_grade_captions: req_bool!("medical_grade_captions", "INGEST_MEDICAL_GRADE_CAPTIONS"),
        monologue_assumption: req_bool!("monologue_assumption", "INGEST_MONOLOGUE_ASSUMPTION"),
        max_cost_per_run: overrides
            .max_cost_per_run
            .or(opt_num!("max_cost_per_run", "INGEST_MAX_COST_PER_RUN")),
        remote_asr_rate_per_min: opt_num!("remote_asr_rate_per_min", "INGEST_REMOTE_ASR_RATE_PER_MIN"),
        cancel_on_sigint: req_bool!("cancel_on_sigint", "INGEST_CANCEL_ON_SIGINT"),
        log_format,
        log_level,
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_required_env() {
        std::env::set_var("DATABASE_URL", "postgres://localhost/ingest_test");
        std::env::set_var("INGEST_CHANNEL_REFERENCE", "UCexample");
        std::env::set_var("INGEST_VOICE_PROFILE_DIR", "/tmp/voices");
    }

    #[test]
    fn loads_from_defaults_plus_required_env() {
        set_required_env();
        let config = load_config(None, &ConfigOverrides::default()).expect("should load");
        assert_eq!(config.channel_reference, "UCexample");
        assert_eq!(config.n_io, 12);
    }

    #[test]
    fn cli_override_wins_over_everything() {
        set_required_env();
        let overrides = ConfigOverrides {
            channel_reference: Some("UCoverridden".into()),
            ..Default::default()
        };
        let config = load_config(None, &overrides).expect("should load");
        assert_eq!(config.channel_reference, "UCoverridden");
    }

    #[test]
    fn missing_required_key_is_reported() {
        std::env::remove_var("DATABASE_URL");
        std::env::set_var("INGEST_CHANNEL_REFERENCE", "UCexample");
        std::env::set_var("INGEST_VOICE_PROFILE_DIR", "/tmp/voices");
        let result = load_config(None, &ConfigOverrides::default());
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }

    #[test]
    fn production_mode_forces_store_audio_locally_off() {
        set_required_env();
        std::env::set_var("INGEST_PRODUCTION_MODE", "true");
        std::env::set_var("INGEST_STORE_AUDIO_LOCALLY", "true");
        let config = load_config(None, &ConfigOverrides::default()).expect("should load");
        assert!(!config.store_audio_locally);
        std::env::remove_var("INGEST_PRODUCTION_MODE");
        std::env::remove_var("INGEST_STORE_AUDIO_LOCALLY");
    }
}
