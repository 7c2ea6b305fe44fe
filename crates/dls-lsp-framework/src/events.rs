//! Event dispatch: an actor that lets any part of the framework — the
//! Router, the Document Manager, a background task — publish an event
//! without knowing who (if anyone) is listening. A private `run()` loop
//! owns the subscriber list, and callers only ever see a cheap, cloneable
//! handle wrapping an `mpsc::Sender`.

use tokio::sync::{broadcast, mpsc};

/// Something that happened inside the server that another component
/// (diagnostics publishing, logging, a future IDE-side extension) may
/// want to react to.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    DocumentOpened { uri: String },
    DocumentChanged { uri: String, version: i32 },
    DocumentSaved { uri: String },
    DocumentClosed { uri: String },
    RequestCompleted { method: String },
    RequestCancelled { method: String },
}

enum Command {
    Publish(ServerEvent),
}

/// A cheap, `Clone`-able reference to the event bus's actor. Sending never
/// blocks the caller on a subscriber being slow — the actor's internal
/// `broadcast::Sender` drops lagging subscribers' oldest events rather
/// than back-pressuring the publisher.
#[derive(Clone)]
pub struct EventBusHandle {
    commands: mpsc::Sender<Command>,
}

impl EventBusHandle {
    /// Publish an event. Fire-and-forget: if the actor has already shut
    /// down this silently does nothing, matching a "best effort, never
    /// fails the caller" stance.
    pub fn publish(&self, event: ServerEvent) {
        let _ = self.commands.try_send(Command::Publish(event));
    }
}

/// Runs the event bus actor. Returns a handle to publish through and a
/// [`broadcast::Receiver`] for the first subscriber; clone the receiver's
/// sender side via [`EventBus::subscribe`] for additional subscribers.
pub struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    #[must_use]
    pub fn start(capacity: usize) -> (EventBusHandle, Self) {
        let (commands_tx, commands_rx) = mpsc::channel(256);
        let (broadcast_tx, _) = broadcast::channel(capacity);
        let bus = Self { sender: broadcast_tx };
        tokio::task::spawn_local(bus.clone_sender().run(commands_rx));
        (EventBusHandle { commands: commands_tx }, bus)
    }

    fn clone_sender(&self) -> BroadcastRunner {
        BroadcastRunner { sender: self.sender.clone() }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }
}

struct BroadcastRunner {
    sender: broadcast::Sender<ServerEvent>,
}

impl BroadcastRunner {
    async fn run(self, mut commands: mpsc::Receiver<Command>) {
        while let Some(Command::Publish(event)) = commands.recv().await {
            // No subscribers is not an error; broadcast::send only fails
            // when the channel has zero receivers.
            let _ = self.sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    #[tokio::test]
    async fn subscriber_observes_published_events() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (handle, bus) = EventBus::start(16);
                let mut rx = bus.subscribe();

                handle.publish(ServerEvent::DocumentOpened { uri: "file:///a.d".into() });
                tokio::task::yield_now().await;
                tokio::task::yield_now().await;

                let event = rx.recv().await.unwrap();
                match event {
                    ServerEvent::DocumentOpened { uri } => assert_eq!(uri, "file:///a.d"),
                    _ => panic!("unexpected event"),
                }
            })
            .await;
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let (handle, _bus) = EventBus::start(16);
                handle.publish(ServerEvent::RequestCompleted { method: "x".into() });
                tokio::task::yield_now().await;
            })
            .await;
    }
}
