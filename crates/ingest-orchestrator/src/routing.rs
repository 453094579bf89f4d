//! Cost and routing policy: decides once per run whether ASR runs
//! on the local-GPU backend or the remote-API backend, and trims an
//! over-budget batch when only the remote backend is reachable.

use ingest_core::{RecognizerMode, RoutingMode, SourceMeta};

/// Small batches default to the remote API regardless of cost: the
/// per-call latency of spinning up local models isn't worth it for a
/// handful of items.
const SMALL_BATCH_THRESHOLD: usize = 5;

pub struct RoutingDecision {
    pub mode: RoutingMode,
    pub recognizer_mode: RecognizerMode,
    /// Items dropped from the batch to fit `max_cost_per_run` when only the
    /// remote backend is available. Empty unless trimming occurred.
    pub trimmed: Vec<SourceMeta>,
}

fn estimate_cost(batch: &[SourceMeta], rate_per_min: f64) -> f64 {
    batch
        .iter()
        .map(|m| f64::from(m.duration_s.unwrap_or(0)) / 60.0 * rate_per_min)
        .sum()
}

/// Chooses the run's routing mode and, if the batch must be trimmed to fit
/// a cost ceiling, returns the items that were dropped (in original order,
/// trimmed from the tail — the orchestrator marks these `skipped`).
#[must_use]
pub fn decide(
    mut batch: Vec<SourceMeta>,
    local_gpu_available: bool,
    max_cost_per_run: Option<f64>,
    remote_rate_per_min: Option<u32>,
) -> (RoutingDecision, Vec<SourceMeta>) {
    if batch.len() <= SMALL_BATCH_THRESHOLD {
        return (
            RoutingDecision {
                mode: RoutingMode::RemoteApi,
                recognizer_mode: RecognizerMode::RemoteApi,
                trimmed: Vec::new(),
            },
            batch,
        );
    }

    let rate = f64::from(remote_rate_per_min.unwrap_or(0));
    let estimated = estimate_cost(&batch, rate);

    let over_budget = max_cost_per_run.is_some_and(|ceiling| estimated > ceiling);

    if over_budget && local_gpu_available {
        return (
            RoutingDecision {
                mode: RoutingMode::LocalGpu,
                recognizer_mode: RecognizerMode::LocalGpu,
                trimmed: Vec::new(),
            },
            batch,
        );
    }

    if !local_gpu_available {
        let mut trimmed = Vec::new();
        if let Some(ceiling) = max_cost_per_run {
            let mut running = 0.0;
            let mut keep = Vec::with_capacity(batch.len());
            for item in batch.drain(..) {
                let cost = f64::from(item.duration_s.unwrap_or(0)) / 60.0 * rate;
                if running + cost > ceiling {
                    trimmed.push(item);
                } else {
                    running += cost;
                    keep.push(item);
                }
            }
            batch = keep;
        }
        return (
            RoutingDecision {
                mode: RoutingMode::RemoteApi,
                recognizer_mode: RecognizerMode::RemoteApi,
                trimmed,
            },
            batch,
        );
    }

    (
        RoutingDecision {
            mode: RoutingMode::LocalGpu,
            recognizer_mode: RecognizerMode::LocalGpu,
            trimmed: Vec::new(),
        },
        batch,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(duration_s: u32) -> SourceMeta {
        let mut meta = SourceMeta::minimal("youtube", format!("id-{duration_s}"));
        meta.duration_s = Some(duration_s);
        meta
    }

    #[test]
    fn small_batches_default_to_remote() {
        let batch = vec![item(60); 3];
        let (decision, kept) = decide(batch, true, Some(0.01), Some(10));
        assert_eq!(decision.mode, RoutingMode::RemoteApi);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn over_budget_with_gpu_routes_local_and_keeps_everything() {
        let batch = vec![item(3600); 20];
        let (decision, kept) = decide(batch, true, Some(1.0), Some(10));
        assert_eq!(decision.mode, RoutingMode::LocalGpu);
        assert!(decision.trimmed.is_empty());
        assert_eq!(kept.len(), 20);
    }

    #[test]
    fn over_budget_without_gpu_trims_to_fit() {
        let batch = vec![item(3600); 20];
        let (decision, kept) = decide(batch, false, Some(5.0), Some(10));
        assert_eq!(decision.mode, RoutingMode::RemoteApi);
        assert!(!decision.trimmed.is_empty());
        assert!(kept.len() < 20);
    }
}
