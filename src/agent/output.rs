//! Output-type contracts for final agent output.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::tools::validate_arguments;

type TypedCheck = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

/// JSON schema (and optional Rust type) a final message must satisfy.
#[derive(Clone)]
pub struct OutputContract {
    name: String,
    schema: Value,
    typed: Option<Arc<TypedCheck>>,
}

impl OutputContract {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            typed: None,
        }
    }

    /// Contract that additionally requires the output to decode as `T`.
    pub fn typed<T: DeserializeOwned + 'static>(name: impl Into<String>, schema: Value) -> Self {
        let check: Arc<TypedCheck> = Arc::new(|value: &Value| {
            T::deserialize(value).map(|_| ()).map_err(|e| e.to_string())
        });
        Self {
            typed: Some(check),
            ..Self::new(name, schema)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Parse and check a candidate final message.
    ///
    /// Accepts bare JSON or JSON wrapped in a fenced code block.
    pub fn validate(&self, text: &str) -> Result<Value, String> {
        let body = strip_code_fence(text);
        let value: Value =
            serde_json::from_str(body).map_err(|e| format!("output is not valid JSON: {e}"))?;
        validate_arguments(&value, &self.schema)?;
        if let Some(check) = &self.typed {
            check(&value)?;
        }
        Ok(value)
    }
}

impl fmt::Debug for OutputContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputContract")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("typed", &self.typed.is_some())
            .finish()
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
