//! The wire shape of one streamed frame.

use robochat_model::{StreamEvent, ToolInput, ToolUse};
use serde::Deserialize;
use serde_json::Value;

/// The message substituted when an error frame carries no detail.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// The JSON payload of a single `data:` line.
///
/// All fields are optional on the wire; which ones are meaningful is
/// determined by `type`. Frames may also omit `type` entirely and
/// carry a bare `error` field.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct WireFrame {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub data: Option<String>,
    pub tool_name: Option<String>,
    pub tool_input: Option<Value>,
    pub tool_id: Option<String>,
    pub reasoning_text: Option<String>,
    pub final_response: Option<String>,
    pub metadata: Option<Value>,
    pub error: Option<String>,
    #[serde(rename = "isComplete")]
    pub is_complete: Option<bool>,
}

impl WireFrame {
    /// Converts the frame into a typed event.
    ///
    /// Returns `None` for frames this client does not understand,
    /// which are skipped rather than treated as errors.
    pub fn into_event(self) -> Option<StreamEvent> {
        let event = match self.kind.as_deref() {
            Some("chunk") => {
                StreamEvent::Chunk(self.data.unwrap_or_default())
            }
            Some("tool_use") => StreamEvent::ToolUse(ToolUse {
                name: self.tool_name.unwrap_or_default(),
                input: self
                    .tool_input
                    .map(ToolInput::from)
                    .unwrap_or_default(),
                id: self.tool_id.filter(|id| !id.is_empty()),
            }),
            Some("reasoning") => {
                StreamEvent::Reasoning(self.reasoning_text.unwrap_or_default())
            }
            Some("complete") => StreamEvent::Complete {
                final_response: self.final_response.unwrap_or_default(),
            },
            Some("metadata") => {
                StreamEvent::Metadata(self.metadata.unwrap_or(Value::Null))
            }
            Some("error") => StreamEvent::Error(error_text(self.error)),
            // Frames without a discriminant (or with one we don't
            // know) still count as errors when they carry an `error`
            // field.
            _ => {
                let error = self.error?;
                StreamEvent::Error(error_text(Some(error)))
            }
        };
        Some(event)
    }
}

fn error_text(error: Option<String>) -> String {
    match error {
        Some(text) if !text.is_empty() => text,
        _ => UNKNOWN_ERROR.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(payload: &str) -> Option<StreamEvent> {
        serde_json::from_str::<WireFrame>(payload)
            .unwrap()
            .into_event()
    }

    #[test]
    fn test_decode_chunk() {
        assert_eq!(
            decode(r#"{"type":"chunk","data":"partial text"}"#),
            Some(StreamEvent::Chunk("partial text".to_owned()))
        );
    }

    #[test]
    fn test_decode_tool_use() {
        let event = decode(
            r#"{"type":"tool_use","tool_name":"move",
                "tool_input":"forward","tool_id":"tool-1"}"#,
        );
        assert_eq!(
            event,
            Some(StreamEvent::ToolUse(ToolUse {
                name: "move".to_owned(),
                input: ToolInput::Text("forward".to_owned()),
                id: Some("tool-1".to_owned()),
            }))
        );
    }

    #[test]
    fn test_decode_structured_tool_input() {
        let event = decode(
            r#"{"type":"tool_use","tool_name":"move",
                "tool_input":{"direction":"forward"},"tool_id":""}"#,
        );
        let Some(StreamEvent::ToolUse(tool_use)) = event else {
            panic!("expected a tool_use event");
        };
        assert_eq!(
            tool_use.input,
            ToolInput::Structured(json!({ "direction": "forward" }))
        );
        // An empty upstream id is treated as absent.
        assert_eq!(tool_use.id, None);
    }

    #[test]
    fn test_decode_complete() {
        assert_eq!(
            decode(
                r#"{"type":"complete","final_response":"Hello","isComplete":true}"#
            ),
            Some(StreamEvent::Complete {
                final_response: "Hello".to_owned(),
            })
        );
    }

    #[test]
    fn test_decode_bare_error() {
        assert_eq!(
            decode(r#"{"error":"agent crashed"}"#),
            Some(StreamEvent::Error("agent crashed".to_owned()))
        );
    }

    #[test]
    fn test_decode_error_without_detail() {
        assert_eq!(
            decode(r#"{"type":"error"}"#),
            Some(StreamEvent::Error(UNKNOWN_ERROR.to_owned()))
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        assert_eq!(decode(r#"{"type":"heartbeat"}"#), None);
    }
}
