//! Registry of live connections.
//!
//! # Responsibilities
//! - Keep every established connection addressable by id
//! - Unregister on close via an RAII guard
//! - Track the open-connection gauge

use std::sync::Arc;

use dashmap::DashMap;

use crate::observability::metrics;
use crate::ws::connection::{Connection, ConnectionId};

/// Shared map of open connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    live: Arc<DashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. Returns a guard that unregisters on drop.
    pub fn register(&self, connection: Connection) -> ConnectionGuard {
        let id = connection.id();
        self.live.insert(id, connection);
        metrics::connection_opened();
        ConnectionGuard {
            live: Arc::clone(&self.live),
            id,
        }
    }

    pub fn get(&self, id: ConnectionId) -> Option<Connection> {
        self.live.get(&id).map(|entry| entry.value().clone())
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> usize {
        self.live.len()
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.live.iter().map(|entry| *entry.key()).collect()
    }
}

/// Guard that tracks a connection's lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    live: Arc<DashMap<ConnectionId, Connection>>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.live.remove(&self.id);
        metrics::connection_closed();
        tracing::trace!(connection_id = %self.id, "Connection unregistered");
    }
}
