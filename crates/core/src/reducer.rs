//! Folds a stream of events into message-store mutations.
//!
//! The backend streams one logical response as a run of same-typed
//! frames with no start/end markers, so consecutive events of the
//! same kind must coalesce into a single growing message instead of
//! producing a new bubble per frame. Tool calls additionally carry an
//! optional upstream correlation id; when both sides have one, it
//! overrides plain adjacency as the grouping signal.

use std::time::SystemTime;

use robochat_model::{StreamEvent, ToolInput, ToolUse};

use crate::store::{MessageDraft, MessageId, MessageKind, MessageStore};

/// The accumulator for one in-flight turn.
///
/// Each variant tracks the message currently being grown. The state
/// is owned by the reducer value, which lives for exactly one turn,
/// so overlapping turns cannot clobber each other.
#[derive(Clone, Debug, PartialEq, Eq)]
enum TurnState {
    /// No message is being grown.
    Idle,
    /// Accumulating streamed text into the given message.
    Chunk(MessageId),
    /// Accumulating a tool call. `call` is the upstream correlation
    /// id of the call, when the backend provided one.
    Tool {
        message: MessageId,
        call: Option<String>,
    },
    /// Accumulating reasoning text into the given message.
    Reasoning(MessageId),
    /// The turn has ended; no further growth is expected.
    Finalized(MessageId),
}

/// Applies coalescing rules, converting a sequence of events into
/// mutations of a [`MessageStore`].
///
/// Create one reducer per turn and feed it every event of that turn
/// in arrival order. All methods are total: inconsistencies (such as
/// the store being cleared mid-turn) degrade to dropped fragments,
/// never panics.
#[derive(Debug)]
pub struct TurnReducer {
    state: TurnState,
}

impl Default for TurnReducer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TurnReducer {
    /// Creates a reducer in the idle state.
    #[inline]
    pub fn new() -> Self {
        Self {
            state: TurnState::Idle,
        }
    }

    /// Whether a `complete` or `error` event has ended the turn.
    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, TurnState::Finalized(_))
    }

    /// Applies one event to the store.
    pub fn apply(&mut self, store: &mut MessageStore, event: StreamEvent) {
        match event {
            StreamEvent::Chunk(text) => self.on_chunk(store, text),
            StreamEvent::ToolUse(tool) => self.on_tool_use(store, tool),
            StreamEvent::Reasoning(text) => self.on_reasoning(store, text),
            StreamEvent::Complete { final_response } => {
                self.on_complete(store, final_response);
            }
            StreamEvent::Error(text) => self.on_error(store, text),
            StreamEvent::Metadata(metadata) => {
                // Observability only; never persisted.
                trace!("turn metadata: {metadata}");
            }
        }
    }

    fn on_chunk(&mut self, store: &mut MessageStore, text: String) {
        if let TurnState::Chunk(id) = &self.state {
            store.append_text(id, &text);
            return;
        }
        let id = store.add(MessageDraft::chunk(text));
        self.state = TurnState::Chunk(id);
    }

    fn on_tool_use(&mut self, store: &mut MessageStore, tool: ToolUse) {
        if let TurnState::Tool { message, call } = &mut self.state {
            // Prefer the upstream correlation id as the grouping
            // signal; fall back to adjacency when either side has
            // none.
            let same_call = match (tool.id.as_deref(), call.as_deref()) {
                (Some(incoming), Some(current)) => incoming == current,
                _ => true,
            };
            if same_call {
                if tool.id.is_some() {
                    *call = tool.id.clone();
                }
                store.update(message, |msg| {
                    msg.tool_name = Some(tool.name);
                    msg.tool_input =
                        Some(merge_tool_input(msg.tool_input.take(), tool.input));
                    if tool.id.is_some() {
                        msg.tool_id = tool.id;
                    }
                    msg.created_at = SystemTime::now();
                });
                return;
            }
        }

        let call = tool.id.clone();
        let id = store.add(MessageDraft::tool_use(tool));
        self.state = TurnState::Tool { message: id, call };
    }

    fn on_reasoning(&mut self, store: &mut MessageStore, text: String) {
        if let TurnState::Reasoning(id) = &self.state {
            store.update(id, |msg| {
                msg.reasoning_text.push_str(&text);
                msg.created_at = SystemTime::now();
            });
            return;
        }
        let id = store.add(MessageDraft::reasoning(text));
        self.state = TurnState::Reasoning(id);
    }

    fn on_complete(&mut self, store: &mut MessageStore, final_response: String) {
        let id = match self.open_message() {
            Some(id) => {
                store.update(&id, |msg| {
                    msg.kind = MessageKind::Complete;
                    msg.text = final_response;
                    msg.is_complete = true;
                });
                id
            }
            // A turn that produced no growing message still gets its
            // final response shown.
            None => {
                let id = store.add(MessageDraft::complete(final_response));
                store.update(&id, |msg| msg.is_complete = true);
                id
            }
        };
        self.state = TurnState::Finalized(id);
    }

    fn on_error(&mut self, store: &mut MessageStore, text: String) {
        let id = match self.open_message() {
            Some(id) => {
                store.update(&id, |msg| {
                    msg.kind = MessageKind::Error;
                    msg.error_text = text;
                });
                id
            }
            None => store.add(MessageDraft::error(text)),
        };
        self.state = TurnState::Finalized(id);
    }

    /// The id of the message currently being grown, if any.
    fn open_message(&self) -> Option<MessageId> {
        match &self.state {
            TurnState::Chunk(id)
            | TurnState::Tool { message: id, .. }
            | TurnState::Reasoning(id) => Some(id.clone()),
            TurnState::Idle | TurnState::Finalized(_) => None,
        }
    }
}

/// String inputs accumulate by concatenation; a structured payload
/// (on either side) replaces wholesale instead of merging.
fn merge_tool_input(current: Option<ToolInput>, incoming: ToolInput) -> ToolInput {
    match (current, incoming) {
        (Some(ToolInput::Text(mut acc)), ToolInput::Text(next)) => {
            acc.push_str(&next);
            ToolInput::Text(acc)
        }
        (_, incoming) => incoming,
    }
}
