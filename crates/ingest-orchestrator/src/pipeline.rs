//! Pipeline Orchestrator: wires the Source Lister output through
//! three bounded-queue worker pools — I/O, ASR, DB — with cooperative
//! cancellation and a cost/routing decision that is sticky for the run.

use std::sync::Arc;

use tokio::sync::{mpsc, OnceCell};
use tokio_util::sync::CancellationToken;

use ingest_core::{
    IngestError, IngestResult, PipelineEvent, PipelineEventKind, SourceListerFilters, SourceMeta,
};

use crate::deps::OrchestratorDeps;
use crate::item::{self, AsrJob, DbJob, IoJob};
use crate::routing;
use crate::summary::RunSummary;

/// Queue capacities are sized at roughly twice their consuming pool, to
/// enforce backpressure without unbounded memory growth.
const QUEUE_CAPACITY_FACTOR: usize = 2;

pub struct Orchestrator {
    deps: Arc<OrchestratorDeps>,
    cancel: CancellationToken,
}

impl Orchestrator {
    #[must_use]
    pub fn new(deps: OrchestratorDeps) -> Self {
        Self {
            deps: Arc::new(deps),
            cancel: CancellationToken::new(),
        }
    }

    /// A clone of the cancellation handle, for wiring to e.g. a SIGINT
    /// handler at the process boundary.
    #[must_use]
    pub fn cancellation_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs one full batch end-to-end: list, filter against existing
    /// state, route, and drain every item through the three pools.
    ///
    /// # Errors
    /// Only startup-fatal classes propagate: enumeration failure.
    pub async fn run(&self, run_summary: &Arc<crate::summary::RunSummaryReporter>) -> IngestResult<RunSummary> {
        let config = &self.deps.config;

        let filters = SourceListerFilters {
            skip_shorts: config.skip_shorts,
            max_duration_s: config.max_duration_s.and_then(|d| u32::try_from(d).ok()),
            newest_first: false,
            skip_live: config.skip_live,
            skip_upcoming: config.skip_upcoming,
            skip_members_only: config.skip_members_only,
        };

        let listed = self
            .deps
            .source_lister
            .list(&config.channel_reference, &filters)
            .await
            .map_err(|e| IngestError::Enumeration { message: e.to_string() })?;

        for meta in &listed {
            self.deps
                .emitter
                .emit(PipelineEvent::new(&meta.source_type, &meta.external_id, PipelineEventKind::Discovered))
                .await;
        }

        let batch = self.filter_already_processed(listed).await;

        let (decision, batch) = routing::decide(
            batch,
            self.deps.local_gpu_available,
            config.max_cost_per_run,
            config.remote_asr_rate_per_min,
        );
        run_summary.set_routing_mode(decision.mode);

        for dropped in decision.trimmed {
            self.deps
                .state_store
                .update_status(
                    &dropped.source_type,
                    &dropped.external_id,
                    ingest_core::SourceStatus::Skipped,
                    ingest_core::StatusUpdate {
                        last_error: Some("dropped to fit cost budget".to_string()),
                        ..Default::default()
                    },
                )
                .await
                .ok();
            self.deps
                .emitter
                .emit(PipelineEvent::new(
                    &dropped.source_type,
                    &dropped.external_id,
                    PipelineEventKind::Skipped {
                        reason: "dropped to fit cost budget".to_string(),
                    },
                ))
                .await;
        }

        self.drain(batch, decision.recognizer_mode).await;

        Ok(run_summary.render_summary())
    }

    /// Per §4.2/§4.10 step 1: a `done` Source is skipped unless
    /// `force_reprocess` is set, and an `error` Source whose persisted
    /// `retry_count` has already reached `retry_max` is skipped too, so a
    /// permanently-failed item isn't fully reprocessed on every run.
    async fn filter_already_processed(&self, listed: Vec<SourceMeta>) -> Vec<SourceMeta> {
        let ids: Vec<(String, String)> = listed.iter().map(|m| (m.source_type.clone(), m.external_id.clone())).collect();
        let existing = self.deps.state_store.batch_check_exists(&ids).await.unwrap_or_default();
        let retry_max = self.deps.config.retry_max;

        let mut kept = Vec::with_capacity(listed.len());
        for meta in listed {
            let key = (meta.source_type.clone(), meta.external_id.clone());
            let status = existing.get(&key).copied();

            let skip_reason = match status {
                Some(ingest_core::SourceStatus::Done) if !self.deps.config.force_reprocess => {
                    Some("already done".to_string())
                }
                Some(ingest_core::SourceStatus::Error) => {
                    match self.deps.state_store.get_state(&meta.source_type, &meta.external_id).await {
                        Ok(Some(source)) if source.retry_count >= retry_max => {
                            Some(format!("retries exhausted ({} >= {retry_max})", source.retry_count))
                        }
                        Ok(_) => None,
                        Err(e) => {
                            tracing::warn!(external_id = %meta.external_id, error = %e, "failed to read source state");
                            None
                        }
                    }
                }
                _ => None,
            };

            if let Some(reason) = skip_reason {
                self.deps
                    .emitter
                    .emit(PipelineEvent::new(
                        &meta.source_type,
                        &meta.external_id,
                        PipelineEventKind::Skipped { reason },
                    ))
                    .await;
                continue;
            }

            if let Err(e) = self.deps.state_store.upsert_source(&meta).await {
                tracing::warn!(external_id = %meta.external_id, error = %e, "failed to upsert source state");
            }
            kept.push(meta);
        }
        kept
    }

    async fn drain(&self, batch: Vec<SourceMeta>, recognizer_mode: ingest_core::RecognizerMode) {
        let n_io = self.deps.config.n_io.max(1);
        let n_asr = self.deps.config.n_asr.max(1);
        let n_db = self.deps.config.n_db.max(1);

        let (io_tx, io_rx) = mpsc::channel::<IoJob>(n_io * QUEUE_CAPACITY_FACTOR);
        let (asr_tx, asr_rx) = mpsc::channel::<AsrJob>(n_asr * QUEUE_CAPACITY_FACTOR);
        let (db_tx, db_rx) = mpsc::channel::<DbJob>(n_db * QUEUE_CAPACITY_FACTOR);

        let io_rx = Arc::new(tokio::sync::Mutex::new(io_rx));
        let asr_rx = Arc::new(tokio::sync::Mutex::new(asr_rx));
        let db_rx = Arc::new(tokio::sync::Mutex::new(db_rx));
        let index_guard = Arc::new(OnceCell::new());

        let mut handles = Vec::new();

        for _ in 0..n_io {
            let deps = Arc::clone(&self.deps);
            let cancel = self.cancel.clone();
            let rx = Arc::clone(&io_rx);
            let asr_tx = asr_tx.clone();
            let db_tx = db_tx.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut guard = rx.lock().await;
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => None,
                            job = guard.recv() => job,
                        }
                    };
                    let Some(job) = job else { break };
                    item::handle_io_job(Arc::clone(&deps), job, cancel.clone(), asr_tx.clone(), db_tx.clone()).await;
                }
            }));
        }

        for _ in 0..n_asr {
            let deps = Arc::clone(&self.deps);
            let cancel = self.cancel.clone();
            let rx = Arc::clone(&asr_rx);
            let db_tx = db_tx.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut guard = rx.lock().await;
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => None,
                            job = guard.recv() => job,
                        }
                    };
                    let Some(job) = job else { break };
                    item::handle_asr_job(Arc::clone(&deps), job, cancel.clone(), recognizer_mode, db_tx.clone()).await;
                }
            }));
        }

        for _ in 0..n_db {
            let deps = Arc::clone(&self.deps);
            let cancel = self.cancel.clone();
            let rx = Arc::clone(&db_rx);
            let index_guard = Arc::clone(&index_guard);
            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut guard = rx.lock().await;
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => None,
                            job = guard.recv() => job,
                        }
                    };
                    let Some(job) = job else { break };
                    item::handle_db_job(Arc::clone(&deps), job, cancel.clone(), Arc::clone(&index_guard)).await;
                }
            }));
        }

        for meta in batch {
            if io_tx.send(IoJob { meta }).await.is_err() {
                break;
            }
        }
        drop(io_tx);
        drop(asr_tx);
        drop(db_tx);

        for handle in handles {
            let _ = handle.await;
        }
    }
}
