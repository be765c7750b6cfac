//! NATS bridge to the host world.
//!
//! The host publishes JSON [`WorldEvent`]s on `tundra.world.*` subjects. The
//! runner publishes every bot's [`RoomEvent`] as JSON on
//! `tundra.room.{room_id}.{kind}`, so host-side consumers can subscribe per
//! room or per event kind.

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tundra_types::{RoomEvent, WorldEvent};
use tundra_world::RoomEvents;

use crate::error::RunnerError;

/// Subject pattern carrying inbound world events.
pub const WORLD_SUBJECTS: &str = "tundra.world.>";

/// Subject an outbound room event is published on.
pub fn room_subject(event: &RoomEvent) -> String {
    format!("tundra.room.{}.{}", event.room, event.kind.name())
}

/// NATS client wrapper for the runner.
#[derive(Clone)]
pub struct NatsClient {
    client: async_nats::Client,
}

impl NatsClient {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, RunnerError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| RunnerError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Subscribe to inbound world events.
    ///
    /// Payloads that fail to decode are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Nats`] if the subscription fails.
    pub async fn world_events(&self) -> Result<BoxStream<'static, WorldEvent>, RunnerError> {
        let subscriber = self
            .client
            .subscribe(WORLD_SUBJECTS.to_owned())
            .await
            .map_err(|e| RunnerError::Nats(format!("failed to subscribe to {WORLD_SUBJECTS}: {e}")))?;
        info!(subject = WORLD_SUBJECTS, "subscribed to world events");

        Ok(subscriber.filter_map(|message| async move {
            match decode_world_event(&message.payload) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(
                        subject = %message.subject,
                        error = %e,
                        "failed to decode world event, skipping"
                    );
                    None
                }
            }
        })
        .boxed())
    }

    /// Publish one room event.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if serialization or publishing fails.
    pub async fn publish_room_event(&self, event: &RoomEvent) -> Result<(), RunnerError> {
        let subject = room_subject(event);
        let payload = serde_json::to_vec(event)?;
        debug!(subject = subject, agent = %event.agent, "publishing room event");
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| RunnerError::Nats(format!("failed to publish to {subject}: {e}")))
    }
}

impl std::fmt::Debug for NatsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsClient")
            .field("connected", &true)
            .finish()
    }
}

/// Decode a world event payload.
///
/// # Errors
///
/// Returns [`RunnerError::Serde`] if the payload is not a valid event.
pub fn decode_world_event(data: &[u8]) -> Result<WorldEvent, RunnerError> {
    Ok(serde_json::from_slice(data)?)
}

/// [`RoomEvents`] sink that hands events to a background publishing task.
///
/// Emitting never blocks; events are published in emission order.
#[derive(Debug, Clone)]
pub struct NatsPublisher {
    queue: mpsc::UnboundedSender<RoomEvent>,
}

impl NatsPublisher {
    /// Start the publishing task on `client`.
    ///
    /// The task ends once every publisher handle is dropped.
    pub fn spawn(client: NatsClient) -> (Self, JoinHandle<()>) {
        let (queue, mut pending) = mpsc::unbounded_channel::<RoomEvent>();
        let task = tokio::spawn(async move {
            while let Some(event) = pending.recv().await {
                if let Err(e) = client.publish_room_event(&event).await {
                    warn!(
                        room = %event.room,
                        kind = event.kind.name(),
                        error = %e,
                        "failed to publish room event"
                    );
                }
            }
            info!("room event publisher stopped");
        });
        (Self { queue }, task)
    }
}

impl RoomEvents for NatsPublisher {
    fn emit(&self, event: RoomEvent) {
        if let Err(e) = self.queue.send(event) {
            warn!(kind = e.0.kind.name(), "publisher is gone, room event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use tundra_types::{AgentId, Position, RoomEventKind, RoomId};

    use super::*;

    #[test]
    fn room_subjects_carry_room_and_kind() {
        let event = RoomEvent::new(RoomId(330), AgentId::new(), RoomEventKind::Frame { frame: 26 });
        assert_eq!(room_subject(&event), "tundra.room.330.frame");

        let event = RoomEvent::new(RoomId(100), AgentId::new(), RoomEventKind::Moved {
            position: Position::new(1, 2),
        });
        assert_eq!(room_subject(&event), "tundra.room.100.moved");
    }

    #[test]
    fn decode_valid_world_event() {
        let raw = br#"{"type":"chat_message","player":"01945c2a-3b4f-7def-8a12-bc34567890ab","text":"hi Gary"}"#;
        let event = decode_world_event(raw);
        assert!(matches!(
            event,
            Ok(WorldEvent::ChatMessage { ref text, .. }) if text == "hi Gary"
        ));
    }

    #[test]
    fn decode_invalid_world_event() {
        assert!(matches!(
            decode_world_event(b"not valid json"),
            Err(RunnerError::Serde(_))
        ));
        assert!(decode_world_event(br#"{"type":"teleport"}"#).is_err());
    }

    // Requires a live NATS server.
    #[tokio::test]
    #[ignore]
    async fn connect_to_nats() {
        let result = NatsClient::connect("nats://localhost:4222").await;
        assert!(result.is_ok());
    }
}
