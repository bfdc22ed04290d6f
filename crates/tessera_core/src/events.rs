//! Pipeline event channel.
//!
//! The analysis pipeline does not depend on any reactive-UI framework;
//! instead it broadcasts typed events that presentation consumers
//! subscribe to. Lagging or absent subscribers never block the
//! pipeline.

use chrono::NaiveDate;
use tokio::sync::broadcast;
use uuid::Uuid;

/// What happened inside the pipeline, for display layers.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    AnalysisStarted {
        entry_id: Uuid,
    },
    AnalysisCompleted {
        entry_id: Uuid,
        pattern_count: usize,
        cascade_count: usize,
    },
    AnalysisFailed {
        entry_id: Uuid,
        reason: String,
    },
    /// The debounce guard suppressed a duplicate analysis attempt.
    AnalysisSkipped {
        entry_id: Uuid,
    },
    SummaryGenerated {
        day: NaiveDate,
    },
}

/// Broadcast fan-out for [`PipelineEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Fire-and-forget: an event with no subscribers is simply dropped.
    pub fn emit(&self, event: PipelineEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!("No pipeline event subscribers: {}", e);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::default();
        bus.emit(PipelineEvent::AnalysisStarted {
            entry_id: Uuid::new_v4(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();
        bus.emit(PipelineEvent::AnalysisCompleted {
            entry_id: id,
            pattern_count: 2,
            cascade_count: 1,
        });
        let ev = rx.recv().await.unwrap();
        assert_eq!(
            ev,
            PipelineEvent::AnalysisCompleted {
                entry_id: id,
                pattern_count: 2,
                cascade_count: 1,
            }
        );
    }
}
