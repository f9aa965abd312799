//! Procedure declaration and execution.
//!
//! # Responsibilities
//! - Declare chains of steps (`extend`, `input`, `query`)
//! - Freeze a chain into a [`Pipeline`] and run it step by step
//! - Attach a terminal handler ([`Dispatcher`])
//!
//! # Design Decisions
//! - Declaration is a persistent linked list: `extend` is O(1) and shares
//!   the base chain, so one base procedure can be specialised per route
//! - Execution is a single loop over a flat slice, no continuation nesting
//! - The first failing step aborts the chain; nothing is retried

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::error::ErpcError;
use crate::procedure::locals::Locals;
use crate::procedure::request::Request;
use crate::procedure::schema::Schema;
use crate::procedure::step::{FnStep, Source, Step, ValidateStep};

struct Link {
    step: Arc<dyn Step>,
    prev: Option<Arc<Link>>,
    depth: usize,
}

/// An immutable, ordered chain of steps.
#[derive(Clone, Default)]
pub struct Procedure {
    tail: Option<Arc<Link>>,
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure").field("steps", &self.len()).finish()
    }
}

impl Procedure {
    /// The empty procedure every chain starts from.
    pub fn base() -> Self {
        Self::default()
    }

    /// Number of steps in the chain.
    pub fn len(&self) -> usize {
        self.tail.as_ref().map_or(0, |link| link.depth)
    }

    pub fn is_empty(&self) -> bool {
        self.tail.is_none()
    }

    /// New procedure running `step` after every step of `self`.
    pub fn extend_step(&self, step: Arc<dyn Step>) -> Self {
        let depth = self.len() + 1;
        Self {
            tail: Some(Arc::new(Link {
                step,
                prev: self.tail.clone(),
                depth,
            })),
        }
    }

    /// Append an async closure as a step.
    ///
    /// The closure's output is serialized into a fragment and merged into
    /// the locals seen by later steps and the handler.
    pub fn extend<F, Fut, T>(&self, f: F) -> Self
    where
        F: Fn(Arc<Request>, Locals) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ErpcError>> + Send + 'static,
        T: Serialize,
    {
        self.extend_step(Arc::new(FnStep(f)))
    }

    /// Validate the request body, contributing `{ input: <validated> }`.
    pub fn input<S: Schema>(&self, schema: S) -> Self {
        self.extend_step(Arc::new(ValidateStep::new(Arc::new(schema), Source::Body)))
    }

    /// Validate the query, contributing `{ query: <validated> }`.
    ///
    /// An `__erpc_query` blob is decoded before validation.
    pub fn query<S: Schema>(&self, schema: S) -> Self {
        self.extend_step(Arc::new(ValidateStep::new(Arc::new(schema), Source::Query)))
    }

    /// Freeze the chain into declaration order.
    pub fn pipeline(&self) -> Pipeline {
        let mut steps = Vec::with_capacity(self.len());
        let mut cursor = self.tail.as_deref();
        while let Some(link) = cursor {
            steps.push(Arc::clone(&link.step));
            cursor = link.prev.as_deref();
        }
        steps.reverse();
        Pipeline {
            steps: steps.into(),
        }
    }

    /// Attach a terminal handler.
    pub fn finalize<H, Fut, R>(&self, handler: H) -> Dispatcher
    where
        H: Fn(Arc<Request>, Locals) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ErpcError>> + Send + 'static,
        R: Serialize,
    {
        let handler: Handler = Arc::new(
            move |req: Arc<Request>, locals: Locals| -> BoxFuture<'static, Result<Value, ErpcError>> {
                let fut = handler(req, locals);
                Box::pin(async move {
                    let result = fut.await?;
                    serde_json::to_value(result).map_err(ErpcError::other)
                })
            },
        );
        Dispatcher {
            pipeline: self.pipeline(),
            handler,
        }
    }
}

/// A frozen step list, ready to run.
#[derive(Clone)]
pub struct Pipeline {
    steps: Arc<[Arc<dyn Step>]>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, merging fragments into fresh locals.
    pub async fn execute(&self, req: &Arc<Request>) -> Result<Locals, ErpcError> {
        let mut locals = Locals::new();
        for (index, step) in self.steps.iter().enumerate() {
            let fragment = step.run(Arc::clone(req), locals.clone()).await.map_err(|e| {
                tracing::debug!(step = index, error = %e, "Procedure step failed");
                e
            })?;
            locals.merge(fragment);
        }
        Ok(locals)
    }
}

/// Boxed terminal handler producing a JSON result.
pub type Handler =
    Arc<dyn Fn(Arc<Request>, Locals) -> BoxFuture<'static, Result<Value, ErpcError>> + Send + Sync>;

/// A finalized procedure: pipeline plus terminal handler.
#[derive(Clone)]
pub struct Dispatcher {
    pipeline: Pipeline,
    handler: Handler,
}

impl Dispatcher {
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the steps and, if they all succeed, the handler.
    pub async fn dispatch(&self, req: Request) -> Result<Value, ErpcError> {
        let req = Arc::new(req);
        let locals = self.pipeline.execute(&req).await?;
        (self.handler)(req, locals).await
    }
}
