//! In-process typed event bus
//!
//! Decouples the retrieval session and media fetcher from their consumers
//! (storage writer, search indexer, UI). Dispatch is synchronous and runs
//! subscribers in registration order; there is no persistence or replay.
//!
//! The bus is an explicitly-constructed value passed by reference, not a
//! process-wide singleton.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::error;

use crate::models::NormalizedDialog;
use crate::telegram::api::RawMessage;

/// Event payloads published on the bus
///
/// Each name carries a fixed payload shape.
#[derive(Debug, Clone)]
pub enum Event {
    /// `dialog:data` — a resolved dialog listing
    DialogData { dialogs: Vec<NormalizedDialog> },
    /// `media:fetch` — request to download attachments for a batch
    MediaFetch { messages: Vec<RawMessage> },
    /// `media:data` — one attachment download finished; `bytes` is `None`
    /// when the download failed or returned nothing
    MediaData {
        message: RawMessage,
        path: PathBuf,
        bytes: Option<Vec<u8>>,
    },
}

/// Event name, used as the subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DialogData,
    MediaFetch,
    MediaData,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DialogData { .. } => EventKind::DialogData,
            Event::MediaFetch { .. } => EventKind::MediaFetch,
            Event::MediaData { .. } => EventKind::MediaData,
        }
    }
}

type Subscriber = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// Typed publish/subscribe hub
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<EventKind, Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for one event name
    ///
    /// Subscribers for the same name run in registration order. A failing
    /// subscriber is logged and does not stop the ones after it.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribers
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Dispatch an event to all current subscribers of its name
    ///
    /// The subscriber list is snapshotted before dispatch, so subscribers
    /// may publish further events without deadlocking the bus.
    pub fn publish(&self, event: &Event) {
        let kind = event.kind();
        let handlers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for handler in handlers {
            if let Err(err) = handler(event) {
                error!("subscriber for {kind:?} failed: {err:#}");
            }
        }
    }
}
