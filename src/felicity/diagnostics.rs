use log::debug;
use std::sync::Mutex;

/// Which repair the normaliser applied to a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Patch {
    SingleQuotes,
    TrailingGarbage,
    MissingTemperatureKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// Decoded text straight off the socket.
    Raw { endpoint: String, text: String },
    /// Text after one repair step.
    Patched { patch: Patch, text: String },
    /// Text handed to the field recognisers.
    Normalized { text: String },
}

/// Receives payload traces from the client and normaliser.
///
/// The client owns its sink, so nothing in the payload path touches a
/// process-wide logger unless [`LogSink`] is chosen.
pub trait DiagnosticSink: Send + Sync {
    fn event(&self, event: &DiagnosticEvent);
}

/// Forwards every event to `log::debug!`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn event(&self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::Raw { endpoint, text } => {
                debug!("{}: raw response (before patch): {:?}", endpoint, text)
            }
            DiagnosticEvent::Patched { patch, text } => debug!("patched {:?}: {:?}", patch, text),
            DiagnosticEvent::Normalized { text } => {
                debug!("response (after patch): {:?}", text)
            }
        }
    }
}

/// Drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn event(&self, _event: &DiagnosticEvent) {}
}

/// Keeps events in memory, mostly useful for inspecting what the repairs did.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn patches(&self) -> Vec<Patch> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DiagnosticEvent::Patched { patch, .. } => Some(patch),
                _ => None,
            })
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn event(&self, event: &DiagnosticEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
