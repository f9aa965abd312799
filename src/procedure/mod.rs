//! Procedure pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Declaration (setup):
//!     Procedure::base()
//!     → extend / input / query (append-only, shares the base chain)
//!     → finalize(handler) → Dispatcher
//!
//! Execution (per request or event):
//!     Request
//!     → Step 1 → Fragment → merged into Locals
//!     → Step 2 (sees Locals of step 1 only) → ...
//!     → handler(Request, Locals) → result
//!     (first failure aborts the rest of the chain)
//! ```
//!
//! # Design Decisions
//! - A procedure is data (an ordered step list), interpreted by one loop
//! - Locals are a JSON object merged key by key, last write wins
//! - Procedures are immutable; extending never touches the base

pub mod locals;
pub mod pipeline;
pub mod query;
pub mod request;
pub mod schema;
pub mod step;

pub use locals::{Fragment, Locals};
pub use pipeline::{Dispatcher, Handler, Pipeline, Procedure};
pub use query::{decode_query, encode_query, ENCODED_QUERY_FIELD};
pub use request::Request;
pub use schema::{schema_fn, typed, Schema, Typed};
pub use step::{Step, StepFuture};
