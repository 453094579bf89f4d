//! Audio Acquirer: downloads and transcodes via the CLI
//! media-downloader, with a compression fallback and inaccessible-content
//! detection.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use ingest_core::{
    AcquireConstraints, AcquiredAudio, AudioAcquirerPort, IngestError, IngestResult, SkipReason,
};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
const TRANSCODE_TIMEOUT: Duration = Duration::from_secs(120);

/// Substrings in a failed downloader invocation's stderr that indicate the
/// content itself is unreachable rather than a transient network problem.
const INACCESSIBLE_MARKERS: &[&str] = &[
    "private video",
    "members-only",
    "this video is unavailable",
    "video unavailable",
    "sign in to confirm your age",
    "geo-restricted",
    "not available in your country",
];

#[derive(Debug, Clone)]
pub struct CliAudioAcquirerConfig {
    pub downloader_binary: String,
    pub transcoder_binary: String,
    pub probe_binary: String,
    pub storage_dir: PathBuf,
}

impl Default for CliAudioAcquirerConfig {
    fn default() -> Self {
        Self {
            downloader_binary: "yt-dlp".to_string(),
            transcoder_binary: "ffmpeg".to_string(),
            probe_binary: "ffprobe".to_string(),
            storage_dir: PathBuf::from("./audio"),
        }
    }
}

pub struct CliAudioAcquirer {
    config: CliAudioAcquirerConfig,
}

impl CliAudioAcquirer {
    #[must_use]
    pub fn new(config: CliAudioAcquirerConfig) -> Self {
        Self { config }
    }

    fn output_path(&self, external_id: &str, container: &str) -> PathBuf {
        self.config.storage_dir.join(format!("{external_id}.{container}"))
    }

    fn media_reference(external_id: &str) -> String {
        if external_id.starts_with("http") {
            external_id.to_string()
        } else {
            format!("https://www.youtube.com/watch?v={external_id}")
        }
    }

    /// Downloads audio for `external_id` into `dest`, distinguishing a
    /// content-inaccessible failure from a transient one.
    async fn download(&self, external_id: &str, dest: &Path) -> IngestResult<Result<(), SkipReason>> {
        let reference = Self::media_reference(external_id);
        let mut cmd = Command::new(&self.config.downloader_binary);
        cmd.args([
            reference.as_str(),
            "-x",
            "--audio-format",
            "wav",
            "-o",
            dest.to_string_lossy().as_ref(),
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let output = timeout(DOWNLOAD_TIMEOUT, cmd.output())
            .await
            .map_err(|_| IngestError::transient_io(format!("download timed out for {external_id}")))?
            .map_err(|e| IngestError::transient_io(format!("failed to spawn downloader: {e}")))?;

        if output.status.success() {
            return Ok(Ok(()));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
        if let Some(marker) = INACCESSIBLE_MARKERS.iter().find(|m| stderr.contains(**m)) {
            return Ok(Err(SkipReason::Inaccessible {
                detail: (*marker).to_string(),
            }));
        }

        Err(IngestError::transient_io(format!(
            "downloader exited with {}: {stderr}",
            output.status
        )))
    }

    /// Re-encodes `path` in place to 16 kHz mono at a lower bitrate, the
    /// compression fallback for oversize audio.
    async fn compress(&self, path: &Path) -> IngestResult<()> {
        let tmp = path.with_extension("compressed.wav");
        let mut cmd = Command::new(&self.config.transcoder_binary);
        cmd.args([
            "-y",
            "-i",
            &path.to_string_lossy(),
            "-ar",
            "16000",
            "-ac",
            "1",
            "-b:a",
            "32k",
            &tmp.to_string_lossy(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

        let output = timeout(TRANSCODE_TIMEOUT, cmd.output())
            .await
            .map_err(|_| IngestError::transient_io("compression step timed out"))?
            .map_err(|e| IngestError::transient_io(format!("failed to spawn transcoder: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::transient_io(format!(
                "compression failed: {stderr}"
            )));
        }

        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| IngestError::from_io_error(&e))?;
        Ok(())
    }

    /// Probes `path`'s duration in seconds. Probing failures are not fatal
    /// to acquisition; the caller falls back to `0.0` and logs.
    async fn probe_duration(&self, path: &Path) -> Option<f64> {
        let mut cmd = Command::new(&self.config.probe_binary);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            &path.to_string_lossy(),
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

        let output = timeout(Duration::from_secs(30), cmd.output()).await.ok()?.ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout).trim().parse().ok()
    }
}

#[async_trait]
impl AudioAcquirerPort for CliAudioAcquirer {
    async fn acquire(
        &self,
        external_id: &str,
        constraints: &AcquireConstraints,
    ) -> IngestResult<Result<AcquiredAudio, SkipReason>> {
        tokio::fs::create_dir_all(&self.config.storage_dir)
            .await
            .map_err(|e| IngestError::from_io_error(&e))?;

        let dest = self.output_path(external_id, &constraints.container);

        match self.download(external_id, &dest).await? {
            Ok(()) => {}
            Err(skip) => return Ok(Err(skip)),
        }

        let cap_bytes = u64::from(constraints.max_size_mb) * 1_000_000;
        let mut metadata = tokio::fs::metadata(&dest)
            .await
            .map_err(|e| IngestError::from_io_error(&e))?;
        let mut compressed = false;

        if metadata.len() > cap_bytes {
            self.compress(&dest).await?;
            metadata = tokio::fs::metadata(&dest)
                .await
                .map_err(|e| IngestError::from_io_error(&e))?;
            compressed = true;

            if metadata.len() > cap_bytes {
                let bytes = metadata.len();
                let _ = tokio::fs::remove_file(&dest).await;
                return Ok(Err(SkipReason::TooLarge { bytes, cap_bytes }));
            }
        }

        let duration_s = self.probe_duration(&dest).await.unwrap_or(0.0);

        Ok(Ok(AcquiredAudio {
            duration_s,
            path: dest,
            size_bytes: metadata.len(),
            compressed,
        }))
    }

    async fn release(&self, audio: &AcquiredAudio) -> IngestResult<()> {
        match tokio::fs::remove_file(&audio.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IngestError::from_io_error(&e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_reference_passes_through_urls() {
        assert_eq!(
            CliAudioAcquirer::media_reference("https://example.com/x"),
            "https://example.com/x"
        );
    }

    #[test]
    fn media_reference_builds_youtube_url_for_bare_ids() {
        assert_eq!(
            CliAudioAcquirer::media_reference("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
