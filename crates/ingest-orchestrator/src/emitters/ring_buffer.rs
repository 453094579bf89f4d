//! In-memory bounded event collector: the test-facing adapter, and the
//! backing store consumed by [`crate::summary::RunSummaryReporter`] in
//! integration tests that want to assert on the raw event sequence rather
//! than just the accumulated counts.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use ingest_core::{PipelineEvent, ProgressEmitterPort};

/// Drops the oldest event once `capacity` is reached rather than growing
/// unbounded, mirroring the "a full subscriber degrades to a dropped event
/// plus a logged warning" rule applied to every non-default subscriber.
pub struct RingBufferEmitter {
    capacity: usize,
    events: Mutex<VecDeque<PipelineEvent>>,
}

impl RingBufferEmitter {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<PipelineEvent> {
        self.events.lock().expect("ring buffer mutex poisoned").iter().cloned().collect()
    }
}

impl Default for RingBufferEmitter {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl ProgressEmitterPort for RingBufferEmitter {
    async fn emit(&self, event: PipelineEvent) {
        let mut events = self.events.lock().expect("ring buffer mutex poisoned");
        if events.len() >= self.capacity {
            events.pop_front();
            tracing::warn!("event ring buffer full, dropping oldest event");
        }
        events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::PipelineEventKind;

    #[tokio::test]
    async fn drops_oldest_once_full() {
        let emitter = RingBufferEmitter::new(2);
        for i in 0..3 {
            emitter
                .emit(PipelineEvent::new("youtube", format!("id-{i}"), PipelineEventKind::Discovered))
                .await;
        }
        let snapshot = emitter.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].external_id, "id-1");
        assert_eq!(snapshot[1].external_id, "id-2");
    }
}
