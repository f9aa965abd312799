//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Declaration (setup):
//!     path "/user/:id/message" + leaf
//!     → segment.rs (split + classify)
//!     → tree.rs (RawRouteTree, mutable, append-only)
//!
//! Route Compilation (at activation):
//!     RawRouteTree snapshot
//!     → router.rs (literal index + single param slot per node)
//!     → Freeze as immutable CompiledRouteTree
//!
//! Incoming upgrade (path)
//!     → segment.rs (split + percent-decode)
//!     → matcher.rs (walk segments, literal before param)
//!     → Return: leaf + variables, or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - No regex, no backtracking: O(path length) matching
//! - Deterministic: same input always matches same leaf
//! - Literal segments win over parameters at the same depth

pub mod matcher;
pub mod router;
pub mod segment;
pub mod tree;

pub use matcher::RouteMatch;
pub use router::{compile, CompiledRouteTree};
pub use segment::{decode_segments, split_path, Segment};
pub use tree::RawRouteTree;
