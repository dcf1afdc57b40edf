use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};

/// Severity/kind of a [`ProgressEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EventLevel {
    /// Informational line.
    Info,
    /// Periodic percent-complete report.
    Progress,
    /// Recording finished and saved.
    Success,
    /// Recording failed.
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventLevel::Info => "info",
            EventLevel::Progress => "progress",
            EventLevel::Success => "success",
            EventLevel::Error => "error",
        })
    }
}

/// One entry of the recording log.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    /// When the event was emitted.
    pub timestamp: DateTime<Local>,
    /// Event kind.
    pub level: EventLevel,
    /// Free-text message.
    pub message: String,
}

/// Receiver of log-worthy recording events.
///
/// `emit` is fire-and-forget: it must not block for long and cannot fail the caller.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn emit(&self, level: EventLevel, message: &str);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, level: EventLevel, message: &str) {
        (**self).emit(level, message);
    }
}

/// Append-only in-memory event log, observable by a UI layer.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ProgressEvent>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events, oldest first.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages of the events at `level`, oldest first.
    pub fn messages(&self, level: EventLevel) -> Vec<String> {
        self.events
            .lock()
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.level == level)
                    .map(|e| e.message.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of events logged.
    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// `true` when nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every logged event.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for EventLog {
    fn emit(&self, level: EventLevel, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(ProgressEvent {
                timestamp: Local::now(),
                level,
                message: message.to_string(),
            });
        }
    }
}

/// Forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, level: EventLevel, message: &str) {
        match level {
            EventLevel::Info => tracing::info!(target: "breathcast::events", "{message}"),
            EventLevel::Progress => tracing::debug!(target: "breathcast::events", "{message}"),
            EventLevel::Success => tracing::info!(target: "breathcast::events", success = true, "{message}"),
            EventLevel::Error => tracing::error!(target: "breathcast::events", "{message}"),
        }
    }
}

/// Sends every event to each of its sinks in order.
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    /// Combine `sinks`.
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, level: EventLevel, message: &str) {
        for sink in &self.sinks {
            sink.emit(level, message);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/events.rs"]
mod tests;
