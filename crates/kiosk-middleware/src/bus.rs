//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! Traffic is partitioned into three [`Topic`] lanes so components only
//! receive the messages they care about:
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Sensor`] | Raw presence samples and sensor faults |
//! | [`Topic::Input`] | Queries, taps, language switches, clarification replies |
//! | [`Topic::Speech`] | Speech engine lifecycle callbacks (start / end / error) |

use kiosk_types::{Event, KioskError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Enumeration of all routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Presence sensor samples, possibly at a high rate.
    Sensor,
    /// Visitor input: typed or transcribed queries, quick-question presses,
    /// taps, language switches.
    Input,
    /// Start / end / error callbacks from the speech engine.
    Speech,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    sensor: broadcast::Sender<Event>,
    input: broadcast::Sender<Event>,
    speech: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (sensor, _) = broadcast::channel(capacity);
        let (input, _) = broadcast::channel(capacity);
        let (speech, _) = broadcast::channel(capacity);
        Self {
            sensor,
            input,
            speech,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event, or
    /// [`KioskError::Channel`] when nobody is listening on the topic.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, KioskError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| KioskError::Channel(format!("No subscribers for topic {topic:?}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Sensor => &self.sensor,
            Topic::Input => &self.input,
            Topic::Speech => &self.speech,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Lagged receivers skip the dropped events with a warning; `None` is
    /// returned only once the bus has shut down.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_types::{EventPayload, QueryOrigin, UtteranceId};

    fn query_event(text: &str) -> Event {
        Event::new(
            "kiosk-middleware::test",
            EventPayload::QuerySubmitted {
                text: text.to_string(),
                origin: QueryOrigin::Typed,
            },
        )
    }

    #[tokio::test]
    async fn publish_and_receive() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Input);

        let event = query_event("license renewal");
        bus.publish_to(Topic::Input, event.clone())?;

        let received = rx.recv().await.ok_or("No event received")?;
        assert_eq!(received.id, event.id);
        Ok(())
    }

    #[test]
    fn publish_without_subscribers_returns_error() {
        let bus = EventBus::default();
        let result = bus.publish_to(Topic::Speech, query_event("x"));
        assert!(matches!(result, Err(KioskError::Channel(_))));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut first = bus.subscribe_to(Topic::Speech);
        let mut second = bus.subscribe_to(Topic::Speech);

        let event = Event::new("engine", EventPayload::SpeechEnded(UtteranceId(4)));
        assert_eq!(bus.publish_to(Topic::Speech, event.clone())?, 2);

        assert_eq!(first.recv().await.ok_or("first missed")?.id, event.id);
        assert_eq!(second.recv().await.ok_or("second missed")?.id, event.id);
        Ok(())
    }

    /// A subscriber on `Sensor` must not receive events published to `Input`.
    #[tokio::test]
    async fn subscriber_does_not_receive_other_topic_events() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut sensor_sub = bus.subscribe_to(Topic::Sensor);
        let _input_sub = bus.subscribe_to(Topic::Input);

        bus.publish_to(Topic::Input, query_event("counter"))?;

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), sensor_sub.recv()).await;
        assert!(result.is_err(), "Sensor subscriber must not receive an Input event");
        Ok(())
    }

    /// Flooding a low-capacity channel must skip the lost events rather than
    /// blocking or surfacing an error to the consumer.
    #[tokio::test]
    async fn lagged_receiver_skips_dropped_events() {
        let bus = EventBus::new(4);
        let mut slow = bus.subscribe_to(Topic::Sensor);
        for _ in 0..100 {
            let _ = bus.publish_to(
                Topic::Sensor,
                Event::new("flood", EventPayload::ManualInteraction),
            );
        }
        assert!(slow.recv().await.is_some());
    }
}
