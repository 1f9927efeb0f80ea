//! Per-agent model settings.

use bon::Builder;
use serde::{Deserialize, Serialize};

/// How the model may use tools on a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    #[default]
    Auto,
    /// The model must call some tool.
    Required,
    /// Tools are offered but must not be called.
    None,
    /// The model must call this specific tool.
    Named(String),
}

impl ToolChoice {
    /// Whether this choice forces the model to call a tool.
    pub fn forces_tool_use(&self) -> bool {
        matches!(self, Self::Required | Self::Named(_))
    }
}

impl From<&str> for ToolChoice {
    fn from(value: &str) -> Self {
        match value {
            "auto" => Self::Auto,
            "required" => Self::Required,
            "none" => Self::None,
            other => Self::Named(other.to_string()),
        }
    }
}

/// Settings applied to every model call an agent makes.
///
/// ```
/// use roci_agents::agent::{ModelSettings, ToolChoice};
///
/// let settings = ModelSettings::builder().tool_choice(ToolChoice::Required).build();
/// assert!(settings.reset_tool_choice);
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct ModelSettings {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    #[builder(default)]
    #[serde(default)]
    pub tool_choice: ToolChoice,
    /// Fall back to [`ToolChoice::Auto`] after a tool batch when the choice
    /// forces tool use.
    #[builder(default = true)]
    #[serde(default = "default_true")]
    pub reset_tool_choice: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            tool_choice: ToolChoice::Auto,
            reset_tool_choice: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_choice_strings() {
        assert_eq!(ToolChoice::from("required"), ToolChoice::Required);
        assert_eq!(ToolChoice::from("auto"), ToolChoice::Auto);
        assert_eq!(
            ToolChoice::from("get_weather"),
            ToolChoice::Named("get_weather".into())
        );
        assert!(ToolChoice::from("get_weather").forces_tool_use());
        assert!(!ToolChoice::None.forces_tool_use());
    }

    #[test]
    fn deserialized_settings_reset_tool_choice_by_default() {
        let settings: ModelSettings = serde_json::from_str(r#"{"tool_choice": "required"}"#).unwrap();
        assert_eq!(settings.tool_choice, ToolChoice::Required);
        assert!(settings.reset_tool_choice);
    }
}
