//! Live connection handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::ErpcError;
use crate::ws::frame::Frame;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Message queued for the socket writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Cloneable handle to one established connection.
///
/// Frames can be emitted at any point until the socket closes, after which
/// `emit` fails with [`ErpcError::ConnectionClosed`].
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::Sender<Outbound>,
    variables: Arc<HashMap<String, String>>,
    query: Arc<Map<String, Value>>,
}

impl Connection {
    pub fn new(
        outbound: mpsc::Sender<Outbound>,
        variables: HashMap<String, String>,
        query: Map<String, Value>,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            outbound,
            variables: Arc::new(variables),
            query: Arc::new(query),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Path variables extracted at upgrade.
    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Query map parsed at upgrade.
    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    /// Send a frame to the peer.
    pub async fn emit<T: Serialize>(&self, event_name: &str, data: T) -> Result<(), ErpcError> {
        let text = Frame::new(event_name, data)
            .and_then(|frame| frame.to_text())
            .map_err(ErpcError::other)?;
        self.outbound
            .send(Outbound::Text(text))
            .await
            .map_err(|_| ErpcError::ConnectionClosed)
    }

    /// Ask the writer to send a close frame.
    pub async fn close(&self) -> Result<(), ErpcError> {
        self.outbound
            .send(Outbound::Close)
            .await
            .map_err(|_| ErpcError::ConnectionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[tokio::test]
    async fn emit_queues_frame() {
        let (tx, mut rx) = mpsc::channel(4);
        let conn = Connection::new(tx, HashMap::new(), Map::new());

        conn.emit("reply", json!({"n": 1})).await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(Outbound::Text(r#"{"eventName":"reply","data":{"n":1}}"#.into()))
        );
    }

    #[tokio::test]
    async fn emit_after_close_fails() {
        let (tx, rx) = mpsc::channel(4);
        let conn = Connection::new(tx, HashMap::new(), Map::new());
        drop(rx);

        assert!(conn.is_closed());
        assert!(matches!(
            conn.emit("reply", ()).await,
            Err(ErpcError::ConnectionClosed)
        ));
    }
}
