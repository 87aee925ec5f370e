//! Event dispatch and event bunches
//!
//! Plugins register handlers in bunches: every entry of a bunch becomes live
//! in one call and is retired in one call. Handlers for the same event run in
//! registration order and share the event payload, so a mutation made by one
//! handler is visible to the next.

use crate::client::ClientId;
use crate::server::Server;
use crate::world::WorldId;
use proto::MessageType;
use std::collections::HashMap;
use std::sync::Arc;

/// Kinds of events plugins can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A client sent a chat message
    Message,
    /// A world was added to the server
    WorldAdded,
    /// A world is about to be removed from the server
    WorldRemoved,
    /// A client finished the handshake and joined a world
    ClientConnected,
    /// A client left
    ClientDisconnected,
}

/// Outgoing chat message as seen by message handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: ClientId,
    pub kind: MessageType,
    pub text: String,
}

/// Payload handed to event handlers
#[derive(Debug)]
pub enum Event<'a> {
    Message(&'a mut ChatMessage),
    WorldAdded(WorldId),
    WorldRemoved(WorldId),
    ClientConnected(ClientId),
    ClientDisconnected(ClientId),
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Message(_) => EventKind::Message,
            Self::WorldAdded(_) => EventKind::WorldAdded,
            Self::WorldRemoved(_) => EventKind::WorldRemoved,
            Self::ClientConnected(_) => EventKind::ClientConnected,
            Self::ClientDisconnected(_) => EventKind::ClientDisconnected,
        }
    }
}

/// Event handler signature
pub type EventFn = dyn Fn(&mut Server, &mut Event<'_>) + Send + Sync;

/// Ordered group of event handlers registered and unregistered together
#[derive(Default)]
pub struct EventBunch {
    entries: Vec<(EventKind, Arc<EventFn>)>,
}

impl EventBunch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for `kind`
    pub fn on<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(&mut Server, &mut Event<'_>) + Send + Sync + 'static,
    {
        self.entries.push((kind, Arc::new(handler)));
        self
    }

    /// Add a chat message handler. The message is mutable.
    pub fn on_message<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Server, &mut ChatMessage) + Send + Sync + 'static,
    {
        self.on(EventKind::Message, move |server, event| {
            if let Event::Message(message) = event {
                handler(server, message);
            }
        })
    }

    pub fn on_world_added<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Server, WorldId) + Send + Sync + 'static,
    {
        self.on(EventKind::WorldAdded, move |server, event| {
            if let Event::WorldAdded(world) = event {
                handler(server, *world);
            }
        })
    }

    pub fn on_world_removed<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Server, WorldId) + Send + Sync + 'static,
    {
        self.on(EventKind::WorldRemoved, move |server, event| {
            if let Event::WorldRemoved(world) = event {
                handler(server, *world);
            }
        })
    }

    pub fn on_client_connected<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Server, ClientId) + Send + Sync + 'static,
    {
        self.on(EventKind::ClientConnected, move |server, event| {
            if let Event::ClientConnected(client) = event {
                handler(server, *client);
            }
        })
    }

    pub fn on_client_disconnected<F>(self, handler: F) -> Self
    where
        F: Fn(&mut Server, ClientId) + Send + Sync + 'static,
    {
        self.on(EventKind::ClientDisconnected, move |server, event| {
            if let Event::ClientDisconnected(client) = event {
                handler(server, *client);
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Proof that a bunch is registered. Consumed by
/// [`EventBus::unregister_bunch`], so a bunch cannot be retired twice.
#[derive(Debug)]
#[must_use = "an event bunch stays registered until its handle is passed to unregister_bunch"]
pub struct EventBunchHandle {
    entries: Vec<(EventKind, u64)>,
}

impl EventBunchHandle {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Registered {
    id: u64,
    handler: Arc<EventFn>,
}

/// Per-kind dispatch lists
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Registered>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every handler of `bunch` to its kind's dispatch list, keeping
    /// the bunch order.
    pub fn register_bunch(&mut self, bunch: EventBunch) -> EventBunchHandle {
        let mut entries = Vec::with_capacity(bunch.entries.len());

        for (kind, handler) in bunch.entries {
            let id = self.next_id;
            self.next_id += 1;
            self.handlers.entry(kind).or_default().push(Registered { id, handler });
            entries.push((kind, id));
        }

        tracing::debug!("Registered event bunch with {} handlers", entries.len());
        EventBunchHandle { entries }
    }

    /// Register a single handler; the degenerate one-entry bunch
    pub fn register<F>(&mut self, kind: EventKind, handler: F) -> EventBunchHandle
    where
        F: Fn(&mut Server, &mut Event<'_>) + Send + Sync + 'static,
    {
        self.register_bunch(EventBunch::new().on(kind, handler))
    }

    /// Remove every handler added by the registration behind `handle`.
    ///
    /// Returns how many handlers were still registered and got removed.
    pub fn unregister_bunch(&mut self, handle: EventBunchHandle) -> usize {
        let mut removed = 0;

        for (kind, id) in handle.entries {
            if let Some(list) = self.handlers.get_mut(&kind) {
                let before = list.len();
                list.retain(|registered| registered.id != id);
                removed += before - list.len();
            }
        }

        self.handlers.retain(|_, list| !list.is_empty());
        tracing::debug!("Unregistered event bunch, {} handlers removed", removed);
        removed
    }

    /// Snapshot of the handlers for `kind`, in dispatch order
    pub fn handlers(&self, kind: EventKind) -> Vec<Arc<EventFn>> {
        self.handlers
            .get(&kind)
            .map(|list| list.iter().map(|registered| Arc::clone(&registered.handler)).collect())
            .unwrap_or_default()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
