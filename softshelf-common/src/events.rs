//! Event types for the SoftShelf event system
//!
//! Provides shared event definitions and the EventBus used by the ingest
//! pipeline to notify downstream consumers (web layer, response caches).
//!
//! Cache invalidation is deliberately modeled as a broadcast event rather
//! than a direct call into the cache: emission is fire-and-forget and a
//! missing subscriber is never an error for the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// SoftShelf event types
///
/// Events are broadcast via [`EventBus`] and can be serialized for
/// transmission to the web layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShelfEvent {
    /// A scan invocation finished (successfully or with per-folder errors).
    ScanCompleted {
        /// Newly staged ledger entries
        new_entries: u64,
        /// Versions removed because their backing file vanished
        deleted_versions: u64,
        /// Products removed because they lost their last version
        deleted_products: u64,
        /// Number of errors recorded during the run
        error_count: usize,
        /// When the scan finished
        timestamp: DateTime<Utc>,
    },

    /// An auto-match batch finished.
    MatchCompleted {
        /// Ledger entries resolved into catalog versions
        matched: u64,
        /// Entries whose folder group failed to materialize
        failed: u64,
        /// When the batch finished
        timestamp: DateTime<Utc>,
    },

    /// Downstream response caches should purge the given key-glob patterns.
    ///
    /// Best-effort: subscribers may be absent, and emission never blocks the
    /// pipeline.
    CacheInvalidation {
        /// Key-glob patterns to purge (e.g. `products_list:*`)
        patterns: Vec<String>,
        /// When the invalidation was requested
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`ShelfEvent`]s.
///
/// Cloneable handle around a `tokio::sync::broadcast` channel. Subscribers
/// receive events emitted after subscription; slow subscribers drop the
/// oldest buffered events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ShelfEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ShelfEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when nobody is listening. Callers that treat events as
    /// fire-and-forget should ignore the result.
    pub fn emit(&self, event: ShelfEvent) -> std::result::Result<usize, Box<ShelfEvent>> {
        self.tx.send(event).map_err(|e| Box::new(e.0))
    }

    /// Configured channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(ShelfEvent::CacheInvalidation {
            patterns: vec!["products_list:*".to_string()],
            timestamp: Utc::now(),
        })
        .unwrap();

        match rx.recv().await.unwrap() {
            ShelfEvent::CacheInvalidation { patterns, .. } => {
                assert_eq!(patterns, vec!["products_list:*".to_string()]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn emit_without_subscribers_is_an_error() {
        let bus = EventBus::new(4);
        let result = bus.emit(ShelfEvent::MatchCompleted {
            matched: 1,
            failed: 0,
            timestamp: Utc::now(),
        });
        assert!(result.is_err());
    }
}
