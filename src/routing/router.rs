//! Route tree compilation.
//!
//! # Responsibilities
//! - Classify raw keys as literal or parameter segments
//! - Build a literal index plus at most one parameter slot per node
//! - Reject ambiguous trees (two parameter names at one depth)
//!
//! # Design Decisions
//! - Pure function of the raw tree snapshot; leaves are cloned in
//! - Immutable after construction (shared without locks)
//! - Errors are reported at compile time, never resolved by picking one

use std::collections::HashMap;

use crate::error::RouteError;
use crate::routing::segment::Segment;
use crate::routing::tree::RawRouteTree;

#[derive(Debug, Clone)]
pub(crate) struct CompiledNode<L> {
    pub(crate) literals: HashMap<String, CompiledNode<L>>,
    pub(crate) param: Option<(String, Box<CompiledNode<L>>)>,
    pub(crate) leaf: Option<L>,
}

/// Read-only matching structure derived from a [`RawRouteTree`].
#[derive(Debug, Clone)]
pub struct CompiledRouteTree<L> {
    pub(crate) root: CompiledNode<L>,
    routes: usize,
}

impl<L> CompiledRouteTree<L> {
    /// Number of addressable leaves.
    pub fn route_count(&self) -> usize {
        self.routes
    }
}

impl<L> Default for CompiledRouteTree<L> {
    fn default() -> Self {
        Self {
            root: CompiledNode {
                literals: HashMap::new(),
                param: None,
                leaf: None,
            },
            routes: 0,
        }
    }
}

/// Compile a raw route tree.
pub fn compile<L: Clone>(raw: &RawRouteTree<L>) -> Result<CompiledRouteTree<L>, RouteError> {
    let mut routes = 0;
    let root = compile_node(raw, "", &mut routes)?;
    tracing::debug!(routes, "Route tree compiled");
    Ok(CompiledRouteTree { root, routes })
}

fn compile_node<L: Clone>(
    raw: &RawRouteTree<L>,
    path: &str,
    routes: &mut usize,
) -> Result<CompiledNode<L>, RouteError> {
    let mut node = CompiledNode {
        literals: HashMap::new(),
        param: None,
        leaf: raw.leaf_ref().cloned(),
    };
    if node.leaf.is_some() {
        *routes += 1;
    }

    for (key, child) in raw.children() {
        let child_path = format!("{path}/{key}");
        match Segment::parse(key) {
            Segment::Literal(text) => {
                let compiled = compile_node(child, &child_path, routes)?;
                node.literals.insert(text, compiled);
            }
            Segment::Param(name) => {
                if name.is_empty() {
                    return Err(RouteError::EmptyParameterName { path: child_path });
                }
                if let Some((existing, _)) = &node.param {
                    return Err(RouteError::ConflictingParameters {
                        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
                        existing: existing.clone(),
                        conflicting: name,
                    });
                }
                let compiled = compile_node(child, &child_path, routes)?;
                node.param = Some((name, Box::new(compiled)));
            }
        }
    }

    Ok(node)
}
