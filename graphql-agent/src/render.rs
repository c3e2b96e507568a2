//! Textual rendering of execution results for the formatting prompt.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// How an execution result is turned into prompt text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderStyle {
    /// Single line JSON text.
    #[default]
    Compact,
    /// Indented JSON text.
    Pretty,
}

/// Render a result value as text.
///
/// Object members keep the order in which the API returned them, so rendering the same
/// result always produces the same text.
pub fn render(value: &Value, style: RenderStyle) -> String {
    match style {
        RenderStyle::Compact => value.to_string(),
        RenderStyle::Pretty => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    }
}
