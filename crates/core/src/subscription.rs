//! Lazy event subscription handles.

use crate::error::Result;
use crate::result::Reply;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;

/// Stream of converted events; an `Err` item is terminal.
pub type EventStream = BoxStream<'static, Result<Reply>>;

type StreamFactory = dyn Fn() -> Result<EventStream> + Send + Sync;

/// Handle returned for event methods.
///
/// Creating the handle contacts nobody; each call to [`subscribe`](Self::subscribe)
/// opens a new stream against the chain.
#[derive(Clone)]
pub struct EventSubscription {
    event: String,
    factory: Arc<StreamFactory>,
}

impl EventSubscription {
    /// Creates a handle for `event` that opens streams with `factory`.
    pub fn new<S, F>(event: S, factory: F) -> Self
    where
        S: Into<String>,
        F: Fn() -> Result<EventStream> + Send + Sync + 'static,
    {
        Self {
            event: event.into(),
            factory: Arc::new(factory),
        }
    }

    /// Remote event name.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Opens a stream of events. Dropping the stream unsubscribes.
    pub fn subscribe(&self) -> Result<EventStream> {
        (self.factory)()
    }
}

impl fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription").field("event", &self.event).finish()
    }
}
