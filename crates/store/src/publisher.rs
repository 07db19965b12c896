//! Event publishers.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use corebank_core::ledger::{DomainEvent, EventPublisher, RepositoryError};
use tracing::{debug, info};

/// Keeps every published event; can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, DomainEvent)>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    /// Creates a publisher that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a publisher whose broker is down.
    #[must_use]
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.set_failing(true);
        publisher
    }

    /// Switches failure mode on or off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Events published so far, with their topics.
    pub fn published(&self) -> Vec<(String, DomainEvent)> {
        self.published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }
}

impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, events: &[DomainEvent]) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(format!(
                "broker unreachable for topic {topic}"
            )));
        }
        let mut published = self
            .published
            .lock()
            .map_err(|_| RepositoryError::Backend("publisher state poisoned".into()))?;
        published.extend(events.iter().map(|event| (topic.to_string(), event.clone())));
        Ok(())
    }
}

/// Writes each event to the log instead of a broker.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    async fn publish(&self, topic: &str, events: &[DomainEvent]) -> Result<(), RepositoryError> {
        for event in events {
            info!(
                topic,
                event_id = %event.event_id,
                event_type = event.event_type(),
                aggregate_type = event.aggregate_type(),
                aggregate_id = %event.aggregate_id(),
                "Domain event"
            );
            match serde_json::to_string(&event.payload) {
                Ok(payload) => debug!(event_id = %event.event_id, %payload, "Domain event payload"),
                Err(err) => debug!(event_id = %event.event_id, error = %err, "Payload not serializable"),
            }
        }
        Ok(())
    }
}
