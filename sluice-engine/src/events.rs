//! Manager events and sinks.
//!
//! Events of an operation are collected while it runs and published only
//! after it commits, so a failed operation emits nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use sluice_core::types::{Amount, BackendId, BasisPoints};

/// Something the manager did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManagerEvent {
    /// Part of an allocation was deposited into a backend.
    Allocated {
        /// Receiving backend.
        backend: BackendId,
        /// Amount deposited.
        amount: Amount,
    },
    /// One rebalance transfer completed.
    Rebalanced {
        /// Source backend.
        from: BackendId,
        /// Destination backend.
        to: BackendId,
        /// Amount moved.
        amount: Amount,
    },
    /// A backend was registered.
    BackendAdded {
        /// New backend.
        backend: BackendId,
    },
    /// A backend was unregistered.
    BackendRemoved {
        /// Removed backend.
        backend: BackendId,
    },
    /// The target table was recomputed.
    TargetAllocationsUpdated {
        /// New weights in registry order.
        weights: Vec<(BackendId, BasisPoints)>,
    },
}

impl ManagerEvent {
    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Allocated { .. } => "allocated",
            Self::Rebalanced { .. } => "rebalanced",
            Self::BackendAdded { .. } => "backend_added",
            Self::BackendRemoved { .. } => "backend_removed",
            Self::TargetAllocationsUpdated { .. } => "target_allocations_updated",
        }
    }
}

/// Receives committed manager events.
pub trait EventSink: Send + Sync {
    /// Called once per event, in emission order.
    fn publish(&self, manager_id: Uuid, event: &ManagerEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, manager_id: Uuid, event: &ManagerEvent) {
        match event {
            ManagerEvent::Allocated { backend, amount } => {
                info!(%manager_id, backend = %backend, amount = %amount, "Allocated");
            }
            ManagerEvent::Rebalanced { from, to, amount } => {
                info!(%manager_id, from = %from, to = %to, amount = %amount, "Rebalanced");
            }
            ManagerEvent::BackendAdded { backend } => {
                info!(%manager_id, backend = %backend, "Backend added");
            }
            ManagerEvent::BackendRemoved { backend } => {
                info!(%manager_id, backend = %backend, "Backend removed");
            }
            ManagerEvent::TargetAllocationsUpdated { weights } => {
                info!(%manager_id, backends = weights.len(), ?weights, "Target allocations updated");
            }
        }
    }
}

/// A published event with its envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Unique event id.
    pub id: Uuid,
    /// Manager that emitted it.
    pub manager_id: Uuid,
    /// Time of publication.
    pub timestamp: DateTime<Utc>,
    /// The event.
    pub event: ManagerEvent,
}

/// In-memory event history.
#[derive(Debug, Default)]
pub struct EventLog {
    records: RwLock<Vec<RecordedEvent>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events with their envelopes.
    #[must_use]
    pub fn records(&self) -> Vec<RecordedEvent> {
        self.records.read().clone()
    }

    /// All recorded events without envelopes.
    #[must_use]
    pub fn events(&self) -> Vec<ManagerEvent> {
        self.records.read().iter().map(|r| r.event.clone()).collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drops all recorded events.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Renders the log as one JSON object per line.
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let records = self.records.read();
        let mut out = String::new();
        for record in records.iter() {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl EventSink for EventLog {
    fn publish(&self, manager_id: Uuid, event: &ManagerEvent) {
        self.records.write().push(RecordedEvent {
            id: Uuid::new_v4(),
            manager_id,
            timestamp: Utc::now(),
            event: event.clone(),
        });
    }
}

/// Forwards every event to several sinks.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Creates a sink with no targets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn publish(&self, manager_id: Uuid, event: &ManagerEvent) {
        for sink in &self.sinks {
            sink.publish(manager_id, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocated(amount: u128) -> ManagerEvent {
        ManagerEvent::Allocated {
            backend: BackendId::new("aave").unwrap(),
            amount: Amount::new(amount),
        }
    }

    #[test]
    fn test_event_log_records_in_order() {
        let log = EventLog::new();
        let manager_id = Uuid::new_v4();
        log.publish(manager_id, &allocated(1));
        log.publish(manager_id, &allocated(2));

        assert_eq!(log.len(), 2);
        assert_eq!(log.events(), vec![allocated(1), allocated(2)]);
        assert!(log.records().iter().all(|r| r.manager_id == manager_id));

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(allocated(5)).unwrap();
        assert_eq!(json["type"], "allocated");
        assert_eq!(json["backend"], "aave");
        assert_eq!(json["amount"], 5);
    }

    #[test]
    fn test_json_lines() {
        let log = EventLog::new();
        log.publish(Uuid::new_v4(), &allocated(1));
        log.publish(
            Uuid::new_v4(),
            &ManagerEvent::BackendRemoved {
                backend: BackendId::new("comp").unwrap(),
            },
        );
        let lines = log.to_json_lines().unwrap();
        assert_eq!(lines.lines().count(), 2);
        let parsed: RecordedEvent = serde_json::from_str(lines.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.event, allocated(1));
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = Arc::new(EventLog::new());
        let second = Arc::new(EventLog::new());
        let fanout = FanoutSink::new()
            .with(first.clone())
            .with(second.clone())
            .with(Arc::new(TracingEventSink));

        fanout.publish(Uuid::new_v4(), &allocated(9));
        assert_eq!(first.len(), 1);
        assert_eq!(second.events(), vec![allocated(9)]);
    }

    #[test]
    fn test_kind() {
        assert_eq!(allocated(1).kind(), "allocated");
    }
}
