//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Declare routes → Compile socket routes → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//! ```
//!
//! # Design Decisions
//! - Socket routes are compiled before the listener accepts anything
//! - Ordered shutdown: stop accept, drain, close

pub mod shutdown;

pub use shutdown::{shutdown_signal, Shutdown};
