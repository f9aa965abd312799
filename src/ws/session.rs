//! Per-connection event dispatch.
//!
//! # Responsibilities
//! - Decode inbound text into frames
//! - Look up the event binding of the matched leaf
//! - Run the bound pipeline with the frame data as request body
//! - Invoke the handler and report failures to the error boundary
//!
//! # Design Decisions
//! - Socket-free: the upgrade glue feeds text in, tests do the same
//! - One frame at a time, so delivery is in order per connection

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::config::UnknownEventPolicy;
use crate::error::ErrorKind;
use crate::http::response::ErrorBoundary;
use crate::observability::metrics;
use crate::procedure::Request;
use crate::ws::connection::Connection;
use crate::ws::event::{EventContext, EventTable};
use crate::ws::frame::Frame;

/// Event name used for error replies under [`UnknownEventPolicy::ErrorFrame`].
pub const ERROR_EVENT: &str = "error";

/// Metrics label for frames whose event name is not bound; client names stay
/// out of the label set.
pub const UNBOUND_EVENT_LABEL: &str = "unknown";

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Pipeline and handler both succeeded.
    Handled,
    /// Not a `{ eventName, data }` frame; dropped.
    Malformed,
    /// No binding for the event name.
    UnknownEvent,
    /// A step or the handler failed; reported, not sent.
    Failed,
}

impl FrameOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            FrameOutcome::Handled => "handled",
            FrameOutcome::Malformed => "malformed",
            FrameOutcome::UnknownEvent => "unknown",
            FrameOutcome::Failed => "failed",
        }
    }
}

/// Dispatch state for one established connection.
pub struct Session {
    connection: Connection,
    table: EventTable,
    template: Request,
    variables: Arc<HashMap<String, String>>,
    query: Arc<Map<String, Value>>,
    unknown_events: UnknownEventPolicy,
    boundary: ErrorBoundary,
}

impl Session {
    /// `template` is the upgrade request; each event reuses it with the
    /// frame's data as body.
    pub fn new(
        connection: Connection,
        table: EventTable,
        template: Request,
        unknown_events: UnknownEventPolicy,
        boundary: ErrorBoundary,
    ) -> Self {
        let variables = Arc::new(connection.variables().clone());
        let query = Arc::new(connection.query().clone());
        Self {
            connection,
            table,
            template,
            variables,
            query,
            unknown_events,
            boundary,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Handle one inbound text message.
    pub async fn handle_text(&self, text: &str) -> FrameOutcome {
        match Frame::parse(text) {
            Some(frame) => self.handle_frame(frame).await,
            None => {
                tracing::trace!(connection_id = %self.connection.id(), "Dropping malformed frame");
                metrics::record_event(UNBOUND_EVENT_LABEL, FrameOutcome::Malformed.as_str());
                FrameOutcome::Malformed
            }
        }
    }

    async fn handle_frame(&self, frame: Frame) -> FrameOutcome {
        let Frame { event_name, data } = frame;
        let connection_id = self.connection.id();

        let Some(binding) = self.table.get(&event_name) else {
            tracing::debug!(connection_id = %connection_id, event = %event_name, "No binding for event");
            if self.unknown_events == UnknownEventPolicy::ErrorFrame {
                let reply = json!({
                    "type": ErrorKind::NotFound,
                    "message": format!("unknown event '{event_name}'"),
                });
                if let Err(e) = self.connection.emit(ERROR_EVENT, reply).await {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Error frame not sent");
                }
            }
            metrics::record_event(UNBOUND_EVENT_LABEL, FrameOutcome::UnknownEvent.as_str());
            return FrameOutcome::UnknownEvent;
        };

        let request = Arc::new(Request {
            body: data,
            ..self.template.clone()
        });

        let result = async {
            let locals = binding.pipeline.execute(&request).await?;
            let ctx = EventContext {
                event: event_name.clone(),
                connection: self.connection.clone(),
                locals,
                variables: Arc::clone(&self.variables),
                query: Arc::clone(&self.query),
            };
            (binding.handler)(ctx).await
        }
        .await;

        let outcome = match result {
            Ok(()) => FrameOutcome::Handled,
            Err(e) => {
                self.boundary.report(&e, &format!("{connection_id} {event_name}"));
                FrameOutcome::Failed
            }
        };
        metrics::record_event(&event_name, outcome.as_str());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErpcError;
    use crate::procedure::{typed, Procedure};
    use crate::ws::connection::Outbound;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[derive(Serialize, Deserialize)]
    struct SendMessage {
        text: String,
    }

    fn session(
        policy: UnknownEventPolicy,
        calls: Arc<AtomicUsize>,
    ) -> (Session, mpsc::Receiver<Outbound>) {
        let table = EventTable::new().on(
            "send",
            &Procedure::base().input(typed::<SendMessage>()),
            move |ctx: EventContext| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let input: SendMessage = ctx.locals.input()?;
                    let id = ctx.variables.get("id").cloned().unwrap_or_default();
                    ctx.connection
                        .emit("sent", json!({ "id": id, "text": input.text }))
                        .await
                }
            },
        );

        let (tx, rx) = mpsc::channel(8);
        let mut variables = HashMap::new();
        variables.insert("id".to_string(), "7".to_string());
        let connection = Connection::new(tx, variables.clone(), Map::new());
        let template = Request {
            params: variables,
            ..Request::default()
        };
        let session = Session::new(connection, table, template, policy, ErrorBoundary::new(false));
        (session, rx)
    }

    #[tokio::test]
    async fn bound_event_runs_handler_with_variables() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (session, mut rx) = session(UnknownEventPolicy::Ignore, calls.clone());

        let outcome = session
            .handle_text(r#"{"eventName":"send","data":{"text":"hi"}}"#)
            .await;
        assert_eq!(outcome, FrameOutcome::Handled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let Some(Outbound::Text(reply)) = rx.recv().await else {
            panic!("expected a reply frame");
        };
        let reply = Frame::parse(&reply).unwrap();
        assert_eq!(reply.event_name, "sent");
        assert_eq!(reply.data, json!({"id": "7", "text": "hi"}));
    }

    #[tokio::test]
    async fn unknown_event_is_ignored_by_default() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (session, mut rx) = session(UnknownEventPolicy::Ignore, calls.clone());

        let outcome = session.handle_text(r#"{"eventName":"unknown","data":{}}"#).await;
        assert_eq!(outcome, FrameOutcome::UnknownEvent);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
        assert!(!session.connection().is_closed());
    }

    #[tokio::test]
    async fn unknown_event_can_reply_with_error_frame() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (session, mut rx) = session(UnknownEventPolicy::ErrorFrame, calls);

        session.handle_text(r#"{"eventName":"nope"}"#).await;
        let Some(Outbound::Text(reply)) = rx.recv().await else {
            panic!("expected an error frame");
        };
        let reply = Frame::parse(&reply).unwrap();
        assert_eq!(reply.event_name, ERROR_EVENT);
        assert_eq!(reply.data["type"], json!("NOT_FOUND"));
    }

    #[tokio::test]
    async fn invalid_payload_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (session, mut rx) = session(UnknownEventPolicy::Ignore, calls.clone());

        let outcome = session
            .handle_text(r#"{"eventName":"send","data":{"text":5}}"#)
            .await;
        assert_eq!(outcome, FrameOutcome::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (session, _rx) = session(UnknownEventPolicy::ErrorFrame, calls.clone());

        assert_eq!(session.handle_text("hello").await, FrameOutcome::Malformed);
        assert_eq!(session.handle_text(r#"{"data":1}"#).await, FrameOutcome::Malformed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_error_is_reported_not_raised() {
        let table = EventTable::new().on("boom", &Procedure::base(), |_| async {
            Err(ErpcError::new(ErrorKind::Forbidden, "nope"))
        });
        let (tx, _rx) = mpsc::channel(1);
        let connection = Connection::new(tx, HashMap::new(), Map::new());
        let session = Session::new(
            connection,
            table,
            Request::default(),
            UnknownEventPolicy::Ignore,
            ErrorBoundary::new(true),
        );

        assert_eq!(
            session.handle_text(r#"{"eventName":"boom"}"#).await,
            FrameOutcome::Failed
        );
    }

    #[test]
    fn unbound_event_names_share_one_metrics_label() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (session, _rx) = session(UnknownEventPolicy::Ignore, Arc::new(AtomicUsize::new(0)));
        ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                for name in ["x-1f2e3d", "x-4c5b6a", "send"] {
                    let frame = json!({ "eventName": name, "data": { "text": "t" } }).to_string();
                    session.handle_text(&frame).await;
                }
            })
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"event="unknown",outcome="unknown"} 2"#), "{rendered}");
        assert!(rendered.contains(r#"event="send",outcome="handled"} 1"#), "{rendered}");
        assert!(!rendered.contains("x-1f2e3d"));
        assert!(!rendered.contains("x-4c5b6a"));
    }
}
