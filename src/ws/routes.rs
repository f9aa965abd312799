//! Socket route declaration and the compiled route table.
//!
//! # Responsibilities
//! - Accumulate `(path, event) → (procedure, handler)` into a raw tree
//! - Compile the tree once at activation
//! - Swap in a recompiled tree on explicit reload only

use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::{ErpcError, RouteError};
use crate::procedure::Procedure;
use crate::routing::{compile, CompiledRouteTree, RawRouteTree};
use crate::ws::event::{EventContext, EventTable};

/// Socket routes declared during setup.
#[derive(Debug, Default)]
pub struct WsRoutes {
    raw: RawRouteTree<EventTable>,
}

impl WsRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing raw tree.
    pub fn from_tree(raw: RawRouteTree<EventTable>) -> Self {
        Self { raw }
    }

    /// Bind `event` on the socket route at `path`.
    pub fn on<H, Fut>(&mut self, path: &str, event: &str, procedure: &Procedure, handler: H) -> &mut Self
    where
        H: Fn(EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ErpcError>> + Send + 'static,
    {
        self.raw
            .node_mut(path)
            .leaf_mut()
            .get_or_insert_with(EventTable::new)
            .bind(event, procedure, handler);
        self
    }

    pub fn tree(&self) -> &RawRouteTree<EventTable> {
        &self.raw
    }

    pub fn tree_mut(&mut self) -> &mut RawRouteTree<EventTable> {
        &mut self.raw
    }

    /// Compile the declared routes into a shareable table.
    pub fn compile(&self) -> Result<WsRouteTable, RouteError> {
        Ok(WsRouteTable::new(compile(&self.raw)?))
    }
}

/// Compiled socket routes, shared read-only by every upgrade.
#[derive(Clone)]
pub struct WsRouteTable {
    compiled: Arc<ArcSwap<CompiledRouteTree<EventTable>>>,
}

impl WsRouteTable {
    pub fn new(compiled: CompiledRouteTree<EventTable>) -> Self {
        Self {
            compiled: Arc::new(ArcSwap::from_pointee(compiled)),
        }
    }

    /// Current compiled tree.
    pub fn load(&self) -> Arc<CompiledRouteTree<EventTable>> {
        self.compiled.load_full()
    }

    /// Recompile from a fresh snapshot and swap it in.
    ///
    /// Connections already established keep the bindings they matched.
    pub fn reload(&self, raw: &RawRouteTree<EventTable>) -> Result<(), RouteError> {
        let compiled = compile(raw)?;
        let routes = compiled.route_count();
        self.compiled.store(Arc::new(compiled));
        tracing::info!(routes, "Socket routes reloaded");
        Ok(())
    }

    pub fn route_count(&self) -> usize {
        self.compiled.load().route_count()
    }
}
