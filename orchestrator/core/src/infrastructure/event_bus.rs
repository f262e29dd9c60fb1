// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for SLA Events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Downstream notifiers subscribe here; the engine never delivers alerts itself.
// Events are not persisted: a subscriber that is not listening misses them.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::SlaEvent;
use crate::domain::tracker::WorkflowInstanceId;

/// Event bus for publishing and subscribing to SLA events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<SlaEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: SlaEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all SLA events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the events of a single workflow instance
    pub fn subscribe_workflow(&self, workflow_instance_id: WorkflowInstanceId) -> WorkflowEventReceiver {
        WorkflowEventReceiver {
            receiver: self.sender.subscribe(),
            workflow_instance_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiver for all SLA events
pub struct EventReceiver {
    receiver: broadcast::Receiver<SlaEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<SlaEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<SlaEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to one workflow instance
pub struct WorkflowEventReceiver {
    receiver: broadcast::Receiver<SlaEvent>,
    workflow_instance_id: WorkflowInstanceId,
}

impl WorkflowEventReceiver {
    /// Receive the next event for the subscribed workflow instance
    pub async fn recv(&mut self) -> Result<SlaEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.workflow_instance_id() == &self.workflow_instance_id {
                return Ok(event);
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::StepName;
    use crate::domain::tracker::TrackerId;
    use chrono::Utc;

    fn cancelled(workflow: &str) -> SlaEvent {
        SlaEvent::TrackerCancelled {
            tracker_id: TrackerId::new(),
            workflow_instance_id: WorkflowInstanceId::new(workflow),
            step_name: StepName::from_persisted("client_review"),
            cancelled_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let event = cancelled("req-1");
        let tracker_id = event.tracker_id();
        event_bus.publish(event);

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.tracker_id(), tracker_id);
    }

    #[tokio::test]
    async fn test_workflow_event_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_workflow(WorkflowInstanceId::new("req-2"));

        event_bus.publish(cancelled("req-1"));
        event_bus.publish(cancelled("req-2"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.workflow_instance_id().as_str(), "req-2");
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish(cancelled("req-1"));

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
        assert!(matches!(receiver1.try_recv(), Err(EventBusError::Empty)));
    }
}
