//! Inbound agent commands.
//!
//! Decoding is two-step: the `type` discriminator is read first, then the
//! matching variant is decoded strictly. Every failure is a
//! [`CommandError`], never a panic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tools::ToolCall;

/// Intent reported when an invocation does not carry one.
pub const NO_INTENT: &str = "No Intent";

/// Command error types
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    #[error("Unknown command type: {0}")]
    UnknownType(String),

    #[error("Invalid content for '{kind}': {message}")]
    InvalidContent { kind: String, message: String },
}

/// A decoded agent reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum AgentCommand {
    /// Ordered tool invocations.
    FunctionCall(Vec<FunctionInvocation>),
    /// Free-form reply; the agent chose not to act.
    Text(String),
}

impl AgentCommand {
    pub fn decode(bytes: &[u8]) -> Result<Self, CommandError> {
        let text = std::str::from_utf8(bytes)?;
        let value: Value = serde_json::from_str(text).map_err(|e| CommandError::MalformedJson(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CommandError::MalformedJson("missing string field 'type'".to_string()))?
            .to_string();
        if !matches!(kind.as_str(), "function_call" | "text") {
            return Err(CommandError::UnknownType(kind));
        }

        serde_json::from_value(value).map_err(|e| CommandError::InvalidContent {
            kind,
            message: e.to_string(),
        })
    }
}

/// One `{name, args}` entry of a `function_call` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInvocation {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl FunctionInvocation {
    /// `args` that are not a JSON object are replaced by an empty map.
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            args,
        }
    }

    /// The `Intent` argument, or [`NO_INTENT`].
    pub fn intent(&self) -> String {
        match self.args.get("Intent") {
            Some(Value::String(intent)) => intent.clone(),
            Some(Value::Null) | None => NO_INTENT.to_string(),
            Some(other) => other.to_string(),
        }
    }

    pub fn tool_call(&self) -> ToolCall {
        ToolCall::from_invocation(&self.name, &self.args)
    }
}
