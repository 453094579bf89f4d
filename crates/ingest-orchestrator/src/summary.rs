//! Run Summary Reporter: accumulates the same event stream the other
//! subscriber adapters subscribe to, and renders the user-visible report at exit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ingest_core::{PipelineEvent, PipelineEventKind, ProgressEmitterPort, RoutingMode};

/// Machine-readable run report, also rendered as the human-facing text a
/// final summary prints at exit: counts of done, skipped, error, plus
/// total segments/embeddings and elapsed time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub done: u64,
    pub skipped: u64,
    pub error: u64,
    pub total_segments: u64,
    pub total_embeddings: u64,
    pub routing_mode: Option<RoutingMode>,
    pub elapsed_seconds: f64,
}

impl RunSummary {
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "done={} skipped={} error={} segments={} embeddings={} routing={:?} elapsed={:.1}s",
            self.done,
            self.skipped,
            self.error,
            self.total_segments,
            self.total_embeddings,
            self.routing_mode,
            self.elapsed_seconds
        )
    }
}

/// Subscribes to the event stream as an ordinary [`ProgressEmitterPort`]
/// and accumulates running counts. `render_summary` is called once, at
/// process exit.
pub struct RunSummaryReporter {
    started_at: Instant,
    done: AtomicU64,
    skipped: AtomicU64,
    error: AtomicU64,
    total_segments: AtomicU64,
    total_embeddings: AtomicU64,
    routing_mode: std::sync::Mutex<Option<RoutingMode>>,
}

impl RunSummaryReporter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            done: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            error: AtomicU64::new(0),
            total_segments: AtomicU64::new(0),
            total_embeddings: AtomicU64::new(0),
            routing_mode: std::sync::Mutex::new(None),
        }
    }

    /// Records the routing mode the cost policy selected for the run; the
    /// decision is sticky, so this is called at most once per run.
    pub fn set_routing_mode(&self, mode: RoutingMode) {
        *self.routing_mode.lock().expect("routing_mode mutex poisoned") = Some(mode);
    }

    #[must_use]
    pub fn render_summary(&self) -> RunSummary {
        RunSummary {
            done: self.done.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            error: self.error.load(Ordering::Relaxed),
            total_segments: self.total_segments.load(Ordering::Relaxed),
            total_embeddings: self.total_embeddings.load(Ordering::Relaxed),
            routing_mode: *self.routing_mode.lock().expect("routing_mode mutex poisoned"),
            elapsed_seconds: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for RunSummaryReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressEmitterPort for RunSummaryReporter {
    async fn emit(&self, event: PipelineEvent) {
        match event.kind {
            PipelineEventKind::Done {
                segments_count,
                embeddings_count,
            } => {
                self.done.fetch_add(1, Ordering::Relaxed);
                self.total_segments
                    .fetch_add(u64::from(segments_count), Ordering::Relaxed);
                self.total_embeddings
                    .fetch_add(u64::from(embeddings_count), Ordering::Relaxed);
            }
            PipelineEventKind::Skipped { .. } => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            PipelineEventKind::Error { .. } => {
                self.error.fetch_add(1, Ordering::Relaxed);
            }
            PipelineEventKind::Discovered
            | PipelineEventKind::Started { .. }
            | PipelineEventKind::StageComplete { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: PipelineEventKind) -> PipelineEvent {
        PipelineEvent::new("youtube", "abc123", kind)
    }

    #[tokio::test]
    async fn accumulates_terminal_counts_only() {
        let reporter = RunSummaryReporter::new();
        reporter.emit(event(PipelineEventKind::Discovered)).await;
        reporter
            .emit(event(PipelineEventKind::Done {
                segments_count: 10,
                embeddings_count: 10,
            }))
            .await;
        reporter
            .emit(event(PipelineEventKind::Skipped {
                reason: "inaccessible".into(),
            }))
            .await;

        let summary = reporter.render_summary();
        assert_eq!(summary.done, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total_segments, 10);
    }

    #[tokio::test]
    async fn render_includes_every_field() {
        let reporter = RunSummaryReporter::new();
        reporter.set_routing_mode(RoutingMode::RemoteApi);
        let text = reporter.render_summary().render();
        assert!(text.contains("done=0"));
        assert!(text.contains("RemoteApi"));
    }
}
