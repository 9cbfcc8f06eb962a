//! Response encoding.
//!
//! A response is an ordered list of named fields rendered as
//! `[<crc(name)>=<value>;...;]`. Field names never appear on the wire, only
//! their checksums.

use crate::crc::field_key;
use crate::return_code::ReturnCode;
use serde_json::{Map, Value};
use std::fmt;

/// Field name under which every response carries its result code.
pub const RETURN_CODE_FIELD: &str = "return_code";

/// An ordered set of response fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireResponse {
    fields: Vec<(String, Value)>,
}

impl WireResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a response carrying only a result code.
    #[must_use]
    pub fn status(code: ReturnCode) -> Self {
        Self::new().with(RETURN_CODE_FIELD, code)
    }

    /// Appends a field, keeping insertion order.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a field in place.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Looks up the first field with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns the result code, if one was set.
    #[must_use]
    pub fn return_code(&self) -> Option<u64> {
        self.get(RETURN_CODE_FIELD).and_then(Value::as_u64)
    }

    /// Iterates fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field has been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders the checksum-keyed wire text.
    #[must_use]
    pub fn encode(&self) -> String {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{}={}", field_key(name), render_value(value)))
            .collect();
        format!("[{};]", parts.join(";"))
    }

    /// Renders the fields as a JSON object keyed by the plain field names.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.clone());
        }
        Value::Object(map)
    }
}

impl fmt::Display for WireResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Strings go out verbatim; everything else uses its JSON text.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
