// crates/conformance-core/src/runtime/events.rs
// ============================================================================
// Module: Run Event Sinks
// Description: Built-in sinks for structured run events.
// Purpose: Emit JSON-line run logs without tying the core to a logging pipeline.
// Dependencies: crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! Run events are serialized as one JSON object per line. The stderr and file
//! sinks suit command-line runs, the memory sink suits tests and embedding
//! callers that inspect events afterwards, and the noop sink discards all.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::interfaces::RunEvent;
use crate::interfaces::RunEventKind;
use crate::interfaces::RunEventSink;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Event sink that writes JSON lines to stderr.
pub struct StderrEventSink;

impl RunEventSink for StderrEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunEventSink for FileEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl RunEventSink for NoopEventSink {
    fn record(&self, _event: &RunEvent) {}
}

/// Event sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<RunEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the recorded events of one kind.
    #[must_use]
    pub fn events_of(&self, kind: RunEventKind) -> Vec<RunEvent> {
        self.events().into_iter().filter(|event| event.event == kind).collect()
    }
}

impl RunEventSink for MemoryEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fans one event out to several sinks.
pub struct FanoutEventSink {
    /// Downstream sinks.
    sinks: Vec<Box<dyn RunEventSink>>,
}

impl FanoutEventSink {
    /// Creates a fan-out over the given sinks.
    #[must_use]
    pub fn new(sinks: Vec<Box<dyn RunEventSink>>) -> Self {
        Self {
            sinks,
        }
    }
}

impl RunEventSink for FanoutEventSink {
    fn record(&self, event: &RunEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
