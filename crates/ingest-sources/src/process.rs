//! Subprocess plumbing shared by the Audio Acquirer and the Caption
//! Fetcher's subtitle-extraction fallback: both drive the same CLI
//! media-downloader binary.

use std::process::Stdio;
use std::time::Duration;

use ingest_core::{IngestError, IngestResult};
use tokio::process::Command;
use tokio::time::timeout;

/// Runs `bin` with `args`, capturing stdout/stderr, bounded by `deadline`.
///
/// Returns `Ok(stdout)` on a zero exit status; a non-zero exit status or a
/// spawn failure is reported as [`IngestError::TransientIo`] so the
/// Orchestrator's retry policy applies uniformly to the whole fallback
/// ladder.
pub(crate) async fn run_capture(
    bin: &str,
    args: &[&str],
    deadline: Duration,
) -> IngestResult<String> {
    let mut cmd = Command::new(bin);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = timeout(deadline, cmd.output())
        .await
        .map_err(|_| IngestError::transient_io(format!("{bin} timed out after {deadline:?}")))?
        .map_err(|e| IngestError::transient_io(format!("failed to spawn {bin}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(IngestError::transient_io(format!(
            "{bin} exited with {}: {stderr}",
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
