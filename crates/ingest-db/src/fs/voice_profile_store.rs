//! Filesystem implementation of the `VoiceProfileStorePort` trait.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use ingest_core::{IngestError, IngestResult, VoiceProfile, VoiceProfileStorePort};

/// On-disk shape of an enrolled profile: one JSON file per target name,
/// `{profile_dir}/{name}.json`.
#[derive(Debug, Deserialize)]
struct ProfileFile {
    name: String,
    centroid: Vec<f32>,
    threshold: f64,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Reads enrolled voice profiles from a directory, one file per profile.
/// Re-read once at Orchestrator startup; never mutated by the pipeline.
pub struct FileVoiceProfileStore {
    profile_dir: PathBuf,
}

impl FileVoiceProfileStore {
    #[must_use]
    pub fn new(profile_dir: PathBuf) -> Self {
        Self { profile_dir }
    }

    fn parse(bytes: &[u8], path: &str) -> IngestResult<VoiceProfile> {
        let parsed: ProfileFile = serde_json::from_slice(bytes)
            .map_err(|e| IngestError::other(format!("malformed voice profile {path}: {e}")))?;

        if parsed.centroid.is_empty() {
            return Err(IngestError::other(format!(
                "voice profile {path} has an empty centroid"
            )));
        }

        Ok(VoiceProfile {
            name: parsed.name,
            centroid: parsed.centroid,
            threshold: parsed.threshold,
            metadata: parsed.metadata,
        })
    }
}

#[async_trait]
impl VoiceProfileStorePort for FileVoiceProfileStore {
    async fn load_all(&self) -> IngestResult<Vec<VoiceProfile>> {
        let mut entries = tokio::fs::read_dir(&self.profile_dir)
            .await
            .map_err(|e| IngestError::from_io_error(&e))?;

        let mut profiles = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| IngestError::from_io_error(&e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| IngestError::from_io_error(&e))?;
            profiles.push(Self::parse(&bytes, &path.display().to_string())?);
        }

        Ok(profiles)
    }

    async fn get(&self, name: &str) -> IngestResult<Option<VoiceProfile>> {
        let path = self.profile_dir.join(format!("{name}.json"));
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(Self::parse(&bytes, &path.display().to_string())?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IngestError::from_io_error(&e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_profile(dir: &std::path::Path, name: &str, centroid: &[f32]) {
        let path = dir.join(format!("{name}.json"));
        let mut file = std::fs::File::create(path).unwrap();
        let json = serde_json::json!({
            "name": name,
            "centroid": centroid,
            "threshold": 0.62,
            "metadata": null,
        });
        write!(file, "{json}").unwrap();
    }

    #[tokio::test]
    async fn loads_all_profiles_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_profile(dir.path(), "target", &[1.0, 0.0, 0.0]);
        write_profile(dir.path(), "guest-ref", &[0.0, 1.0, 0.0]);

        let store = FileVoiceProfileStore::new(dir.path().to_path_buf());
        let mut profiles = store.load_all().await.unwrap();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "guest-ref");
        assert_eq!(profiles[1].name, "target");
    }

    #[tokio::test]
    async fn get_returns_none_for_missing_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVoiceProfileStore::new(dir.path().to_path_buf());
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_empty_centroid() {
        let dir = tempfile::tempdir().unwrap();
        write_profile(dir.path(), "broken", &[]);
        let store = FileVoiceProfileStore::new(dir.path().to_path_buf());
        assert!(store.get("broken").await.is_err());
    }
}
