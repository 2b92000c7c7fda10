//! Event Bus Module
//!
//! Minimal publish/subscribe used for `ready`, `get`, `set`, `remove`, and
//! `error` notifications. Handlers run synchronously at emit time, in
//! registration order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

// == Event Kind ==
/// The event channels a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// One-shot rehydration-complete signal
    Ready,
    /// A key was resolved (or defaulted) by `get`
    Get,
    /// A key was stored
    Set,
    /// A key was removed
    Remove,
    /// A recovered failure (codec, duration, backend mirror)
    Error,
}

// == Event ==
/// A published notification with its payload.
///
/// Keys are logical (unprefixed). Error events carry the rendered failure
/// message and, where it helps, the key or payload that provoked it.
#[derive(Debug, Clone)]
pub enum Event {
    Ready,
    Get {
        key: String,
        value: Option<Value>,
    },
    Set {
        key: String,
        value: Value,
    },
    Remove {
        key: String,
    },
    Error {
        message: String,
        context: Option<String>,
    },
}

impl Event {
    /// The channel this event is published on.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Ready => EventKind::Ready,
            Event::Get { .. } => EventKind::Get,
            Event::Set { .. } => EventKind::Set,
            Event::Remove { .. } => EventKind::Remove,
            Event::Error { .. } => EventKind::Error,
        }
    }

    /// Builds an error event from any displayable failure.
    pub(crate) fn error(err: impl std::fmt::Display, context: Option<String>) -> Self {
        Event::Error {
            message: err.to_string(),
            context,
        }
    }
}

// == Handler ==
/// A subscribed event handler.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync + 'static>;

// == Event Bus ==
/// Handler registry shared between the store and its spawned mirror tasks.
///
/// Dispatch runs against a snapshot of the handler list taken outside the
/// registry lock, so a handler may subscribe further handlers; those see
/// subsequent events only.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<EventKind, Vec<Handler>>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a handler to an event kind.
    ///
    /// Multiple handlers per kind are supported and called in registration
    /// order.
    pub fn on(&self, kind: EventKind, handler: impl Fn(&Event) + Send + Sync + 'static) {
        self.handlers
            .lock()
            .expect("event handler registry poisoned")
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Publishes an event to every handler subscribed to its kind.
    pub fn emit(&self, event: &Event) {
        let snapshot: Vec<Handler> = {
            let handlers = self
                .handlers
                .lock()
                .expect("event handler registry poisoned");
            handlers.get(&event.kind()).cloned().unwrap_or_default()
        };
        for handler in snapshot {
            handler(event);
        }
    }
}
