//! Event bindings: the hierarchy end of a socket route.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};

use crate::error::ErpcError;
use crate::procedure::{Locals, Pipeline, Procedure};
use crate::ws::connection::Connection;

/// Everything a bound event handler gets.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub event: String,
    pub connection: Connection,
    pub locals: Locals,
    pub variables: Arc<HashMap<String, String>>,
    pub query: Arc<Map<String, Value>>,
}

pub type EventHandler =
    Arc<dyn Fn(EventContext) -> BoxFuture<'static, Result<(), ErpcError>> + Send + Sync>;

/// A procedure pipeline and its terminal event handler.
#[derive(Clone)]
pub struct EventBinding {
    pub(crate) pipeline: Pipeline,
    pub(crate) handler: EventHandler,
}

impl EventBinding {
    pub fn new<H, Fut>(procedure: &Procedure, handler: H) -> Self
    where
        H: Fn(EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ErpcError>> + Send + 'static,
    {
        let handler: EventHandler = Arc::new(
            move |ctx: EventContext| -> BoxFuture<'static, Result<(), ErpcError>> {
                Box::pin(handler(ctx))
            },
        );
        Self {
            pipeline: procedure.pipeline(),
            handler,
        }
    }
}

/// Event name → binding, held by a route leaf.
#[derive(Clone, Default)]
pub struct EventTable {
    events: HashMap<String, Arc<EventBinding>>,
}

impl std::fmt::Debug for EventTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.events.keys().collect();
        names.sort();
        f.debug_struct("EventTable").field("events", &names).finish()
    }
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`EventTable::bind`].
    pub fn on<H, Fut>(mut self, event: &str, procedure: &Procedure, handler: H) -> Self
    where
        H: Fn(EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ErpcError>> + Send + 'static,
    {
        self.bind(event, procedure, handler);
        self
    }

    /// Bind `event`, replacing any earlier binding of the same name.
    pub fn bind<H, Fut>(&mut self, event: &str, procedure: &Procedure, handler: H)
    where
        H: Fn(EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ErpcError>> + Send + 'static,
    {
        let binding = Arc::new(EventBinding::new(procedure, handler));
        if self.events.insert(event.to_string(), binding).is_some() {
            tracing::warn!(event, "Event binding replaced");
        }
    }

    pub fn get(&self, event: &str) -> Option<&Arc<EventBinding>> {
        self.events.get(event)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }
}
