//! Wire frame for persistent connections.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ "eventName": string, "data": any }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub event_name: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new<T: Serialize>(event_name: impl Into<String>, data: T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_name: event_name.into(),
            data: serde_json::to_value(data)?,
        })
    }

    /// Parse an inbound message; anything that is not a frame yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
