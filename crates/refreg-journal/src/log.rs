//! Change log with atomic batch commit
//!
//! Operations stage their events in an [`EventBatch`] while they run. The
//! batch is handed to [`ChangeLog::commit`] only once every check has
//! passed and every mutation has been applied, so a failed operation emits
//! nothing.

use std::fmt;

use refreg_core::RegistryConfig;

use crate::events::{ChangeEvent, LoggedEvent};
use crate::sink::{EventSink, MemorySink, TracingSink};

/// Events staged by a single operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventBatch {
    events: Vec<ChangeEvent>,
}

impl EventBatch {
    /// Empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an event
    pub fn push(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }

    /// Stage an event if present
    pub fn push_opt(&mut self, event: Option<ChangeEvent>) {
        if let Some(event) = event {
            self.events.push(event);
        }
    }

    /// Number of staged events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl From<ChangeEvent> for EventBatch {
    fn from(event: ChangeEvent) -> Self {
        Self {
            events: vec![event],
        }
    }
}

/// Sequenced change log fanning out to sinks
pub struct ChangeLog {
    next_sequence: u64,
    history: MemorySink,
    sinks: Vec<Box<dyn EventSink>>,
}

impl ChangeLog {
    /// Unbounded history, no extra sinks
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            history: MemorySink::new(),
            sinks: Vec::new(),
        }
    }

    /// Build from registry configuration
    pub fn from_config(config: &RegistryConfig) -> Self {
        let mut log = Self::new();
        if let Some(limit) = config.event_history_limit {
            log.history = MemorySink::bounded(limit);
        }
        if config.trace_events {
            log.add_sink(TracingSink);
        }
        log
    }

    /// Attach a sink for events committed from now on
    pub fn add_sink(&mut self, sink: impl EventSink + 'static) {
        tracing::debug!(sink = sink.name(), "attached event sink");
        self.sinks.push(Box::new(sink));
    }

    /// Continue numbering after a restored log position
    pub fn resume_at(&mut self, next_sequence: u64) {
        self.next_sequence = next_sequence.max(1);
    }

    /// Sequence number the next committed event will receive
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Assign sequence numbers, retain and forward to sinks
    pub fn commit(&mut self, batch: EventBatch) -> Vec<LoggedEvent> {
        let mut committed = Vec::with_capacity(batch.len());
        for event in batch.events {
            let logged = LoggedEvent {
                sequence: self.next_sequence,
                event,
            };
            self.next_sequence += 1;
            for sink in &mut self.sinks {
                sink.emit(&logged);
            }
            self.history.push(logged.clone());
            committed.push(logged);
        }
        committed
    }

    /// Retained events, oldest first
    pub fn history(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.history.events()
    }

    /// Retained events after `sequence`
    pub fn since(&self, sequence: u64) -> Vec<LoggedEvent> {
        self.history.since(sequence)
    }
}

impl Default for ChangeLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeLog")
            .field("next_sequence", &self.next_sequence)
            .field("retained", &self.history.len())
            .field(
                "sinks",
                &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
