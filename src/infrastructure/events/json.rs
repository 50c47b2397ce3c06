//! JSON Event Sink
//!
//! Outputs compiler events as NDJSON for CI/automation consumption.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::application::events::{BuildEvents, CompilerEvent, Subscription};

/// Event sink that writes one JSON object per compiler event
pub struct JsonEventSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonEventSink {
    /// Create a new JSON event sink writing to stdout
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Create a JSON event sink writing to a custom writer (for testing)
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn on_event(&self, event: &CompilerEvent) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "{}", event.to_json());
        let _ = writer.flush();
    }

    /// Forward every event on `events` to this sink
    pub fn attach(self: &Arc<Self>, events: &BuildEvents) -> Subscription {
        let sink = Arc::clone(self);
        events.subscribe_all(move |event| sink.on_event(event))
    }
}
