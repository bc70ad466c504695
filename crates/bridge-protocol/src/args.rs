//! Typed access to command arguments.
//!
//! Clients send arbitrary JSON objects as arguments. Handlers read them
//! through accessors that fall back to an explicit default when a field is
//! missing or has the wrong shape.

use serde_json::Value;

/// Arguments of a single command invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Value);

impl Args {
    /// Wrap a raw JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Raw field lookup.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Integer field, or `default` when absent or not an integer.
    pub fn i64_or(&self, name: &str, default: i64) -> i64 {
        self.get(name).and_then(Value::as_i64).unwrap_or(default)
    }

    /// Boolean field, or `default` when absent or not a boolean.
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(default)
    }

    /// String field.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Array field; empty when absent or not an array.
    pub fn array(&self, name: &str) -> &[Value] {
        self.get(name)
            .and_then(Value::as_array)
            .map_or(&[], |items| items.as_slice())
    }

    /// The raw argument value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume into the raw argument value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Args {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
