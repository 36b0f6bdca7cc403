//! Action records.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Action type dispatched once when a core finishes construction.
pub const INIT: &str = "@@scaleflow/INIT";

const TYPE_KEY: &str = "type";
const PAYLOAD_KEY: &str = "payload";

/// A record with a defined `type` field and any other fields.
///
/// The dispatch chain itself carries raw [`Value`]s so middleware can
/// intercept whatever it understands; the base dispatch turns a value into an
/// `Action` with [`TryFrom`], which is where malformed actions are rejected.
/// A `type` of `null` is still a defined type; only a missing key is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Action(Map<String, Value>);

impl Action {
    pub fn new(kind: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(TYPE_KEY.to_string(), kind.into());
        Self(fields)
    }

    pub fn with_payload(self, payload: impl Into<Value>) -> Self {
        self.with_field(PAYLOAD_KEY, payload)
    }

    /// Set an extra field. Setting `type` replaces the action type.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> &Value {
        self.0.get(TYPE_KEY).unwrap_or(&Value::Null)
    }

    /// Whether the action type is the string `kind`.
    pub fn is(&self, kind: &str) -> bool {
        self.kind().as_str() == Some(kind)
    }

    pub fn payload(&self) -> Option<&Value> {
        self.0.get(PAYLOAD_KEY)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Value::String(kind) => f.write_str(kind),
            other => write!(f, "{other}"),
        }
    }
}

impl TryFrom<Value> for Action {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) if fields.contains_key(TYPE_KEY) => Ok(Self(fields)),
            Value::Object(_) => Err(CoreError::InvalidActionKind {
                reason: "actions may not have an undefined \"type\" property",
            }),
            _ => Err(CoreError::InvalidActionKind {
                reason: "actions must be plain objects",
            }),
        }
    }
}

impl From<Action> for Value {
    fn from(action: Action) -> Self {
        Value::Object(action.0)
    }
}
