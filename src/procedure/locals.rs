//! Per-request accumulated context.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ErpcError, ErrorKind};

/// One step's contribution to [`Locals`].
pub type Fragment = Map<String, Value>;

/// Context merged from every fragment produced so far.
///
/// Fragments are merged in step order; a later fragment overwrites keys of
/// an earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Locals(Map<String, Value>);

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fragment, last write wins.
    pub fn merge(&mut self, fragment: Fragment) {
        for (key, value) in fragment {
            self.0.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Deserialize a field into a concrete type.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, ErpcError> {
        let value = self.0.get(key).cloned().ok_or_else(|| {
            ErpcError::new(
                ErrorKind::InternalServerError,
                format!("locals field '{key}' is not set"),
            )
        })?;
        serde_json::from_value(value).map_err(ErpcError::other)
    }

    /// Validated body contributed by an `input` step.
    pub fn input<T: DeserializeOwned>(&self) -> Result<T, ErpcError> {
        self.get_as("input")
    }

    /// Validated query contributed by a `query` step.
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, ErpcError> {
        self.get_as("query")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Fragment> for Locals {
    fn from(map: Fragment) -> Self {
        Self(map)
    }
}

/// Convert a step's output into a fragment.
///
/// The value must serialize to a JSON object (`()` and `null` count as an
/// empty fragment).
pub fn into_fragment<T: Serialize>(value: T) -> Result<Fragment, ErpcError> {
    match serde_json::to_value(value).map_err(ErpcError::other)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Fragment::new()),
        other => Err(ErpcError::other(format!(
            "step output must be an object, got {other}"
        ))),
    }
}
