//! Event types and the broadcast bus for the ReelScout service.
//!
//! Every state change the dashboard cares about is published as a
//! `ReelEvent` on the `EventBus`. Delivery is at-most-once per connected
//! observer: events published while no observer is subscribed are dropped,
//! and observers whose receiver has lagged past the channel capacity lose
//! the overwritten events. There is no replay.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{ConnectionStatus, ScrapeSession, Video};

/// State-change notifications pushed to dashboard observers.
///
/// Serialized for SSE transmission with a `type` tag, so observers can
/// dispatch without knowing the full union.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReelEvent {
    /// Full snapshot of a video after any persisted change
    VideoUpdated { video: Video },

    /// Full snapshot of a session after any persisted change
    SessionUpdated { session: ScrapeSession },

    /// Automation driver connection transition
    ConnectionStatus {
        status: ConnectionStatus,
        host: String,
        port: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Per-item progress for the active session
    ScrapeProgress {
        session_id: Uuid,
        processed: u32,
        total: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        current: Option<Video>,
    },

    /// Session-fatal failure (batch fetch or background task panic path)
    FatalError {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl ReelEvent {
    /// Event type string used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            ReelEvent::VideoUpdated { .. } => "video_updated",
            ReelEvent::SessionUpdated { .. } => "session_updated",
            ReelEvent::ConnectionStatus { .. } => "connection_status",
            ReelEvent::ScrapeProgress { .. } => "scrape_progress",
            ReelEvent::FatalError { .. } => "fatal_error",
        }
    }
}

/// Broadcast bus carrying `ReelEvent`s to all connected observers.
///
/// Wraps `tokio::sync::broadcast`: subscribers receive only events emitted
/// after they subscribe, closed receivers are pruned automatically, and
/// per-subscriber ordering follows emit order.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReelEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// Events beyond capacity overwrite the oldest buffered event for any
    /// lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ReelEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the subscriber count, or an error when no observer is
    /// currently subscribed.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: ReelEvent) -> Result<usize, broadcast::error::SendError<ReelEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening.
    ///
    /// The orchestrator uses this for all progress events: a dashboard that
    /// is not open is not an error.
    pub fn emit_lossy(&self, event: ReelEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionStatus;

    fn sample_session() -> ScrapeSession {
        ScrapeSession::new("test".to_string(), 2)
    }

    #[test]
    fn emit_without_subscribers_is_err_but_lossy_is_silent() {
        let bus = EventBus::new(16);
        let event = ReelEvent::SessionUpdated {
            session: sample_session(),
        };
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event); // must not panic
    }

    #[test]
    fn subscribers_receive_events_in_emit_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let session = sample_session();
        bus.emit_lossy(ReelEvent::SessionUpdated {
            session: session.clone(),
        });
        bus.emit_lossy(ReelEvent::ScrapeProgress {
            session_id: session.id,
            processed: 1,
            total: 2,
            current: None,
        });

        match rx.try_recv().unwrap() {
            ReelEvent::SessionUpdated { session: s } => {
                assert_eq!(s.status, SessionStatus::Running)
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.try_recv().unwrap() {
            ReelEvent::ScrapeProgress { processed, .. } => assert_eq!(processed, 1),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn late_subscribers_get_no_replay() {
        let bus = EventBus::new(16);
        bus.emit_lossy(ReelEvent::FatalError {
            message: "before subscribe".to_string(),
            detail: None,
        });
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let bus = EventBus::new(16);
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(ReelEvent::FatalError {
            message: "boom".to_string(),
            detail: Some("detail".to_string()),
        })
        .unwrap();
        assert_eq!(json["type"], "fatal_error");
        assert_eq!(json["message"], "boom");
    }
}
