use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Mirror;

/// Body of a `console` event emitted by the debugger backend whenever the
/// debuggee calls a `console.*` method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleEvent {
    /// Name of the console method, e.g. `log`, `warn`, `dir`.
    #[serde(default = "default_method", alias = "level")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<Value>,
    #[serde(default)]
    pub parameters: Vec<Mirror>,
}

fn default_method() -> String {
    "log".to_string()
}

impl ConsoleEvent {
    pub fn new(method: impl Into<String>, parameters: Vec<Mirror>) -> Self {
        Self {
            method: method.into(),
            text: None,
            url: None,
            line: None,
            column: None,
            stack_trace: None,
            parameters,
        }
    }
}
