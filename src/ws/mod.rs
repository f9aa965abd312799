//! Persistent-connection subsystem.
//!
//! # Data Flow
//! ```text
//! Setup:
//!     WsRoutes::on(path, event, procedure, handler)
//!     → RawRouteTree<EventTable>
//!     → compiled once at activation → WsRouteTable
//!
//! Upgrade (http::websocket):
//!     path → WsRouteTable match → EventTable + variables
//!     → Connection + Session, registered in ConnectionRegistry
//!
//! Per frame (session.rs):
//!     text → Frame { eventName, data }
//!     → EventTable lookup → Pipeline(data) → handler(EventContext)
//! ```
//!
//! # Design Decisions
//! - At-most-once, in order per connection: frames are handled one at a time
//! - Malformed frames and failures never close the connection
//! - Failures are logged, never sent over the wire

pub mod connection;
pub mod event;
pub mod frame;
pub mod registry;
pub mod routes;
pub mod session;

pub use connection::{Connection, ConnectionId, Outbound};
pub use event::{EventContext, EventTable};
pub use frame::Frame;
pub use registry::{ConnectionGuard, ConnectionRegistry};
pub use routes::{WsRouteTable, WsRoutes};
pub use session::{FrameOutcome, Session};
