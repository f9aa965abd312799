//! Validator capability consumed by `input`/`query` steps.
//!
//! The core only relies on the validate-or-reject contract. [`Typed`] is the
//! stock implementation: the schema is a Rust type and validation is serde
//! deserialization, re-serialized so that later steps see the normalized
//! value (unknown fields dropped, defaults filled in).

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationFailure;

#[async_trait]
pub trait Schema: Send + Sync + 'static {
    /// Validate a raw value, returning the validated form.
    async fn validate(&self, raw: Value) -> Result<Value, ValidationFailure>;
}

/// Schema defined by a Rust type.
pub struct Typed<T>(PhantomData<fn() -> T>);

/// Build a [`Typed`] schema for `T`.
pub fn typed<T>() -> Typed<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    Typed(PhantomData)
}

#[async_trait]
impl<T> Schema for Typed<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    async fn validate(&self, raw: Value) -> Result<Value, ValidationFailure> {
        let value: T = serde_json::from_value(raw)?;
        Ok(serde_json::to_value(value)?)
    }
}

/// Schema defined by a plain function.
pub struct FnSchema<F>(F);

pub fn schema_fn<F>(f: F) -> FnSchema<F>
where
    F: Fn(Value) -> Result<Value, ValidationFailure> + Send + Sync + 'static,
{
    FnSchema(f)
}

#[async_trait]
impl<F> Schema for FnSchema<F>
where
    F: Fn(Value) -> Result<Value, ValidationFailure> + Send + Sync + 'static,
{
    async fn validate(&self, raw: Value) -> Result<Value, ValidationFailure> {
        (self.0)(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Message {
        msg: String,
        #[serde(default)]
        urgent: bool,
    }

    #[tokio::test]
    async fn typed_accepts_and_normalizes() {
        let schema = typed::<Message>();
        let out = schema
            .validate(json!({"msg": "hi", "extra": 1}))
            .await
            .unwrap();
        assert_eq!(out, json!({"msg": "hi", "urgent": false}));
    }

    #[tokio::test]
    async fn typed_rejects_wrong_shape() {
        let schema = typed::<Message>();
        let err = schema.validate(json!({"msg": 5})).await.unwrap_err();
        assert!(err.message.contains("invalid type"));
    }

    #[tokio::test]
    async fn revalidation_is_idempotent() {
        let schema = typed::<Message>();
        let once = schema.validate(json!({"msg": "hi"})).await.unwrap();
        let twice = schema.validate(once.clone()).await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn fn_schema() {
        let positive = schema_fn(|v| match v.as_i64() {
            Some(n) if n > 0 => Ok(v),
            _ => Err(ValidationFailure::new("expected a positive integer")),
        });
        assert!(positive.validate(json!(3)).await.is_ok());
        assert!(positive.validate(json!(-3)).await.is_err());
    }
}
