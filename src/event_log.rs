//! Flow execution audit trail
//!
//! - Event: envelope with id + timestamp + kind
//! - EventKind: flow-level and fine-grained variants
//! - EventLog: thread-safe, append-only log

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use serde::Serialize;
use serde_json::Value;

/// Single event in the flow execution log
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since log creation (ms)
    pub timestamp_ms: u64,
    /// Event type and data
    pub kind: EventKind,
}

/// All possible event types
///
/// Uses Arc<str> for flow fields to enable zero-cost cloning.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // FLOW LEVEL
    // ═══════════════════════════════════════════
    FlowStarted {
        flow: Arc<str>,
        input: Value,
    },
    FlowCompleted {
        flow: Arc<str>,
        output: Value,
        duration_ms: u64,
    },
    FlowFailed {
        flow: Arc<str>,
        error: String,
    },

    // ═══════════════════════════════════════════
    // FINE-GRAINED (template/provider)
    // ═══════════════════════════════════════════
    TemplateRendered {
        flow: Arc<str>,
        prompt: String,
    },
    ProviderCalled {
        flow: Arc<str>,
        provider: String,
        model: String,
        prompt_len: usize,
    },
    ProviderResponded {
        flow: Arc<str>,
        output_len: usize,
        tokens_used: Option<u32>,
    },
}

impl EventKind {
    /// The flow this event belongs to
    pub fn flow(&self) -> &str {
        match self {
            Self::FlowStarted { flow, .. }
            | Self::FlowCompleted { flow, .. }
            | Self::FlowFailed { flow, .. }
            | Self::TemplateRendered { flow, .. }
            | Self::ProviderCalled { flow, .. }
            | Self::ProviderResponded { flow, .. } => flow,
        }
    }

    /// Check if this is a terminal (completed/failed) event
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FlowCompleted { .. } | Self::FlowFailed { .. })
    }
}

/// Thread-safe, append-only event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event (thread-safe, returns event ID)
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        };

        self.events.write().push(event);
        id
    }

    /// Get all events (cloned)
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Filter events by flow name
    pub fn filter_flow(&self, flow: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind.flow() == flow)
            .collect()
    }

    /// Serialize to JSON for persistence/debugging
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emit_assigns_monotonic_ids() {
        let log = EventLog::new();
        let flow: Arc<str> = Arc::from("answer-question");

        let a = log.emit(EventKind::FlowStarted {
            flow: Arc::clone(&flow),
            input: json!({}),
        });
        let b = log.emit(EventKind::FlowFailed {
            flow,
            error: "boom".to_string(),
        });

        assert!(b > a);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn filter_by_flow() {
        let log = EventLog::new();
        log.emit(EventKind::FlowStarted {
            flow: Arc::from("answer-question"),
            input: json!({}),
        });
        log.emit(EventKind::FlowStarted {
            flow: Arc::from("check-availability"),
            input: json!({}),
        });

        let events = log.filter_flow("answer-question");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind.flow(), "answer-question");
    }

    #[test]
    fn terminal_events() {
        let completed = EventKind::FlowCompleted {
            flow: Arc::from("f"),
            output: json!({}),
            duration_ms: 10,
        };
        let called = EventKind::ProviderCalled {
            flow: Arc::from("f"),
            provider: "mock".to_string(),
            model: "m".to_string(),
            prompt_len: 5,
        };
        assert!(completed.is_terminal());
        assert!(!called.is_terminal());
    }

    #[test]
    fn to_json_is_an_array() {
        let log = EventLog::new();
        log.emit(EventKind::FlowFailed {
            flow: Arc::from("f"),
            error: "e".to_string(),
        });
        assert!(log.to_json().is_array());
    }

    #[test]
    fn clones_share_the_log() {
        let log = EventLog::new();
        let clone = log.clone();
        clone.emit(EventKind::FlowFailed {
            flow: Arc::from("f"),
            error: "e".to_string(),
        });
        assert_eq!(log.len(), 1);
    }
}
