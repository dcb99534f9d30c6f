use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The typed representation of one decoded frame from the agent
/// stream.
///
/// Exactly one semantic payload is carried per event. Events are
/// ephemeral: they are handed from the frame parser to the consumer
/// and never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A partial text fragment of the running response.
    Chunk(String),
    /// A tool invocation reported by the agent.
    ToolUse(ToolUse),
    /// A fragment of the agent's reasoning trace.
    Reasoning(String),
    /// The final response; ends the turn.
    Complete {
        /// The full response text for the turn.
        final_response: String,
    },
    /// Observability payload, not part of the conversation.
    Metadata(Value),
    /// An in-band failure; ends the turn.
    Error(String),
}

/// Describes one streamed tool invocation frame.
///
/// A logical tool call may span several consecutive `ToolUse` events,
/// each carrying another piece of the input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUse {
    /// The name of the invoked tool.
    pub name: String,
    /// The (possibly partial) input for this invocation.
    pub input: ToolInput,
    /// The upstream correlation id, when the backend provides one.
    pub id: Option<String>,
}

/// The input payload of a tool invocation.
///
/// Textual inputs stream incrementally and accumulate by
/// concatenation; structured inputs arrive whole and replace any
/// previous value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolInput {
    /// A textual input fragment.
    Text(String),
    /// A structured input payload.
    Structured(Value),
}

impl ToolInput {
    /// Returns the textual content, if this input is textual.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolInput::Text(text) => Some(text),
            ToolInput::Structured(_) => None,
        }
    }
}

impl Default for ToolInput {
    #[inline]
    fn default() -> Self {
        ToolInput::Text(String::new())
    }
}

impl From<Value> for ToolInput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => ToolInput::Text(text),
            other => ToolInput::Structured(other),
        }
    }
}
