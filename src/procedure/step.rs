//! Steps: async units of work that each contribute a context fragment.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::error::ErpcError;
use crate::procedure::locals::{into_fragment, Fragment, Locals};
use crate::procedure::query::decode_query;
use crate::procedure::request::Request;
use crate::procedure::schema::Schema;

pub type StepFuture = BoxFuture<'static, Result<Fragment, ErpcError>>;

/// One link of a procedure.
///
/// `locals` is a snapshot of everything merged before this step; a step
/// never sees its own fragment or those of later steps.
pub trait Step: Send + Sync + 'static {
    fn run(&self, req: Arc<Request>, locals: Locals) -> StepFuture;
}

/// Adapts an async closure into a [`Step`].
pub(crate) struct FnStep<F>(pub F);

impl<F, Fut, T> Step for FnStep<F>
where
    F: Fn(Arc<Request>, Locals) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ErpcError>> + Send + 'static,
    T: Serialize,
{
    fn run(&self, req: Arc<Request>, locals: Locals) -> StepFuture {
        let fut = (self.0)(req, locals);
        Box::pin(async move { into_fragment(fut.await?) })
    }
}

/// Where a validation step reads its raw value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    Body,
    Query,
}

/// Built-in step behind `Procedure::input` and `Procedure::query`.
pub(crate) struct ValidateStep {
    schema: Arc<dyn Schema>,
    source: Source,
}

impl ValidateStep {
    pub(crate) fn new(schema: Arc<dyn Schema>, source: Source) -> Self {
        Self { schema, source }
    }

    fn key(&self) -> &'static str {
        match self.source {
            Source::Body => "input",
            Source::Query => "query",
        }
    }
}

impl Step for ValidateStep {
    fn run(&self, req: Arc<Request>, _locals: Locals) -> StepFuture {
        let schema = Arc::clone(&self.schema);
        let source = self.source;
        let key = self.key();

        Box::pin(async move {
            let raw = match source {
                Source::Body => req.body.clone(),
                Source::Query => decode_query(&req.query)?,
            };
            let validated: Value = schema.validate(raw).await?;

            let mut fragment = Fragment::new();
            fragment.insert(key.to_string(), validated);
            Ok(fragment)
        })
    }
}
