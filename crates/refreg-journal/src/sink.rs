//! Event sinks
//!
//! Sinks receive events only after the operation that produced them has
//! committed.

use std::collections::VecDeque;
use tokio::sync::broadcast;

use crate::events::LoggedEvent;

/// Destination for committed events
pub trait EventSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Receive one committed event
    fn emit(&mut self, event: &LoggedEvent);
}

/// Logs every committed event at `info`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn emit(&mut self, event: &LoggedEvent) {
        tracing::info!(
            sequence = event.sequence,
            kind = event.event.kind(),
            actor = %event.event.actor(),
            record = ?event.event.record(),
            "{}",
            event.event
        );
    }
}

/// Retains committed events in memory, oldest first
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: VecDeque<LoggedEvent>,
    limit: Option<usize>,
}

impl MemorySink {
    /// Unbounded history
    pub fn new() -> Self {
        Self::default()
    }

    /// History keeping at most `limit` most recent events
    pub fn bounded(limit: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(limit),
            limit: Some(limit),
        }
    }

    /// Retained events, oldest first
    pub fn events(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.events.iter()
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is retained
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events with a sequence greater than `sequence`
    pub fn since(&self, sequence: u64) -> Vec<LoggedEvent> {
        self.events
            .iter()
            .filter(|event| event.sequence > sequence)
            .cloned()
            .collect()
    }

    /// Append, evicting the oldest entry when full
    pub fn push(&mut self, event: LoggedEvent) {
        if let Some(limit) = self.limit {
            while self.events.len() >= limit {
                self.events.pop_front();
            }
        }
        self.events.push_back(event);
    }
}

impl EventSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn emit(&mut self, event: &LoggedEvent) {
        self.push(event.clone());
    }
}

/// Fans committed events out to async subscribers such as indexers
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<LoggedEvent>,
}

impl BroadcastSink {
    /// Create with a per-subscriber buffer of `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New subscriber receiving events committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LoggedEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn emit(&mut self, event: &LoggedEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event.clone());
    }
}
