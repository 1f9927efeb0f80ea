//! Typed access to tool call arguments.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::RociError;

/// Arguments of one tool call, as sent by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments {
    value: Value,
}

impl ToolArguments {
    /// Wrap a raw argument payload.
    ///
    /// Models occasionally encode the arguments object as a JSON string; such
    /// payloads are decoded here so validation and getters see the object.
    pub fn new(value: Value) -> Self {
        let value = match value {
            Value::String(raw) => match raw.trim() {
                "" => Value::Object(Default::default()),
                trimmed => serde_json::from_str(trimmed).unwrap_or(Value::String(raw)),
            },
            other => other,
        };
        Self { value }
    }

    pub fn raw(&self) -> &Value {
        &self.value
    }

    pub fn into_inner(self) -> Value {
        self.value
    }

    fn required<'a, T>(
        &'a self,
        key: &str,
        kind: &str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, RociError> {
        self.value.get(key).and_then(extract).ok_or_else(|| {
            RociError::InvalidArgument(format!("missing or non-{kind} argument '{key}'"))
        })
    }

    pub fn get_str(&self, key: &str) -> Result<&str, RociError> {
        self.required(key, "string", Value::as_str)
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, RociError> {
        self.required(key, "integer", Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, RociError> {
        self.required(key, "number", Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, RociError> {
        self.required(key, "boolean", Value::as_bool)
    }

    pub fn get_array(&self, key: &str) -> Result<&Vec<Value>, RociError> {
        self.required(key, "array", Value::as_array)
    }

    pub fn get_object(&self, key: &str) -> Result<&Value, RociError> {
        self.required(key, "object", |v| v.is_object().then_some(v))
    }

    /// Deserialize the whole payload into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, RociError> {
        T::deserialize(&self.value)
            .map_err(|e| RociError::InvalidArgument(format!("cannot decode arguments: {e}")))
    }
}

impl From<Value> for ToolArguments {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
