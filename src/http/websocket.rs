//! Upgrade glue for persistent connections.
//!
//! # Responsibilities
//! - Catch every request no declared route handled
//! - Match upgrade paths against the compiled socket routes
//! - Run the per-connection reader and writer tasks
//!
//! # Data Flow
//! ```text
//! Client ──upgrade──→ fallback → WsRouteTable match → Connection + Session
//! Client ──frames───→ reader loop → Session::handle_text (one at a time)
//! Client ←──frames─── writer task ← mpsc ← Connection::emit
//! ```
//!
//! # Design Decisions
//! - Non-upgrade and unmatched requests get a NOT_FOUND envelope
//! - The reader never runs two frames concurrently
//! - Shutdown sends a close frame to every open socket

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::config::UnknownEventPolicy;
use crate::error::{ErpcError, ErrorKind};
use crate::http::request::{parse_cookies, parse_query, request_id, RequestOptions};
use crate::http::response::ErrorBoundary;
use crate::lifecycle::Shutdown;
use crate::procedure::Request;
use crate::routing::decode_segments;
use crate::ws::{Connection, ConnectionRegistry, EventTable, Outbound, Session, WsRouteTable};

/// State shared by every upgrade.
pub(crate) struct WsContext {
    pub(crate) table: WsRouteTable,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) boundary: ErrorBoundary,
    pub(crate) options: RequestOptions,
    pub(crate) unknown_events: UnknownEventPolicy,
    pub(crate) outbound_buffer: usize,
    pub(crate) closing: Arc<Shutdown>,
}

/// Fallback for requests no declared route handled.
pub(crate) async fn fallback(
    ctx: Arc<WsContext>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path = uri.path().to_string();
    let not_found = |ctx: &WsContext| {
        let err = ErpcError::new(ErrorKind::NotFound, format!("no route for {method} {path}"));
        ctx.boundary.respond(&err, request_id(&headers))
    };

    let Ok(upgrade) = upgrade else {
        return not_found(&ctx);
    };

    let tree = ctx.table.load();
    let Some(matched) = tree.match_segments(&decode_segments(&path)) else {
        tracing::debug!(path = %path, "Upgrade did not match any socket route");
        return not_found(&ctx);
    };
    let table = matched.leaf.clone();
    let variables = matched.variables;

    let query = parse_query(uri.query());
    let cookies = if ctx.options.cookie_parser {
        parse_cookies(&headers)
    } else {
        HashMap::new()
    };
    let template = Request {
        method: method.clone(),
        path: path.clone(),
        headers: headers.clone(),
        params: variables.clone(),
        query: query.clone(),
        cookies,
        body: Value::Null,
    };

    upgrade.on_upgrade(move |socket| run_socket(ctx, socket, table, template, variables, query))
}

async fn run_socket(
    ctx: Arc<WsContext>,
    socket: WebSocket,
    table: EventTable,
    template: Request,
    variables: HashMap<String, String>,
    query: Map<String, Value>,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel(ctx.outbound_buffer);

    let connection = Connection::new(tx, variables, query);
    let id = connection.id();
    let guard = ctx.registry.register(connection.clone());
    let mut closing = ctx.closing.subscribe();

    tracing::info!(connection_id = %id, path = %template.path, "Connection established");

    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let result = match outbound {
                Outbound::Text(text) => sink.send(Message::Text(text.into())).await,
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            };
            if let Err(e) = result {
                tracing::debug!(connection_id = %id, error = %e, "Socket write failed");
                break;
            }
        }
    });

    let session = Session::new(
        connection,
        table,
        template,
        ctx.unknown_events,
        ctx.boundary.clone(),
    );

    loop {
        let message = tokio::select! {
            message = stream.next() => message,
            _ = closing.recv() => {
                let _ = session.connection().close().await;
                break;
            }
        };
        match message {
            Some(Ok(Message::Text(text))) => {
                session.handle_text(text.as_str()).await;
            }
            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => {
                    session.handle_text(text).await;
                }
                Err(_) => tracing::trace!(connection_id = %id, "Dropping non-UTF-8 binary frame"),
            },
            Some(Ok(Message::Close(_))) | None => break,
            // Ping/pong is answered by the transport.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!(connection_id = %id, error = %e, "Socket read failed");
                break;
            }
        }
    }

    drop(session);
    drop(guard);
    if !writer.is_finished() {
        // Handles held elsewhere keep the channel open.
        let abort = writer.abort_handle();
        if tokio::time::timeout(std::time::Duration::from_secs(1), writer).await.is_err() {
            abort.abort();
        }
    }
    tracing::info!(connection_id = %id, "Connection closed");
}
