//! Lifecycle event sinks.
//!
//! The orchestrator emits `stage.*` lifecycle events through an
//! [`EventSink`] so callers can observe a run without coupling to the
//! logging backend.

use tracing::info;

/// Receives pipeline lifecycle events.
pub trait EventSink: Send + Sync {
    /// Emits an event. Implementations must never panic; delivery
    /// failures are swallowed.
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// Discards all events. The default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// Logs events through the `tracing` framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        info!(event_type = %event_type, event_data = ?data, "event");
    }
}

/// Collects events in memory for assertions in tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<(String, Option<serde_json::Value>)>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events collected so far.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<serde_json::Value>)> {
        self.events.read().clone()
    }

    /// Event types collected so far, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Number of events with the given type.
    #[must_use]
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t == event_type)
            .count()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_records_in_order() {
        let sink = CollectingEventSink::new();
        sink.emit("stage.started", Some(serde_json::json!({"stage": "content"})));
        sink.emit("stage.completed", None);

        assert_eq!(sink.event_types(), vec!["stage.started", "stage.completed"]);
        assert_eq!(sink.count("stage.started"), 1);
        assert_eq!(sink.count("stage.failed"), 0);
    }

    #[test]
    fn test_noop_sink_discards() {
        NoOpEventSink.emit("stage.started", None);
    }
}
