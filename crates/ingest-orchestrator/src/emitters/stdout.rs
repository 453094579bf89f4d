//! Structured stdout JSON-lines logger, the production default subscriber
//! (structured ambient logging: `{ts, level, component, external_id, event,
//! fields}` records, no PII beyond public video metadata).

use async_trait::async_trait;
use serde_json::json;

use ingest_core::{PipelineEvent, PipelineEventKind, ProgressEmitterPort};

/// Emits one JSON object per line to stdout via `tracing`, so it composes
/// with whatever subscriber the binary installs (pretty or JSON, per
/// `log_format`) instead of writing to stdout directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutJsonEmitter;

fn event_name(kind: &PipelineEventKind) -> &'static str {
    match kind {
        PipelineEventKind::Discovered => "discovered",
        PipelineEventKind::Started { .. } => "started",
        PipelineEventKind::StageComplete { .. } => "stage_complete",
        PipelineEventKind::Done { .. } => "done",
        PipelineEventKind::Error { .. } => "error",
        PipelineEventKind::Skipped { .. } => "skipped",
    }
}

#[async_trait]
impl ProgressEmitterPort for StdoutJsonEmitter {
    async fn emit(&self, event: PipelineEvent) {
        let fields = match &event.kind {
            PipelineEventKind::Started { stage } | PipelineEventKind::StageComplete { stage } => {
                json!({ "stage": stage.as_str() })
            }
            PipelineEventKind::Done {
                segments_count,
                embeddings_count,
            } => json!({ "segments_count": segments_count, "embeddings_count": embeddings_count }),
            PipelineEventKind::Error {
                message,
                retry_count,
            } => json!({ "message": message, "retry_count": retry_count }),
            PipelineEventKind::Skipped { reason } => json!({ "reason": reason }),
            PipelineEventKind::Discovered => json!({}),
        };

        tracing::info!(
            ts = %event.ts.to_rfc3339(),
            component = "orchestrator",
            external_id = %event.external_id,
            source_type = %event.source_type,
            event = event_name(&event.kind),
            fields = %fields,
            "pipeline event"
        );
    }
}
