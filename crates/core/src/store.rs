//! The ordered collection of messages for one conversation.
//!
//! The store owns a single `Vec` as the source of truth; lookups are
//! linear, which is fine at conversation scale and avoids keeping a
//! side index that could drift out of sync with the list. Observers
//! detect changes through the [`revision`](MessageStore::revision)
//! counter, which is bumped on every mutation.

use std::fmt::{self, Display};
use std::time::{SystemTime, UNIX_EPOCH};

use robochat_model::{ToolInput, ToolUse};

/// Identifies a message within one store instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Returns the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a message represents. Determines which payload fields are
/// meaningful.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Streamed (or user-entered) text.
    Chunk,
    /// A tool invocation by the agent.
    ToolUse,
    /// The agent's reasoning trace.
    Reasoning,
    /// A finalized response.
    Complete,
    /// Observability payload.
    Metadata,
    /// A failure shown in place of a response.
    Error,
}

/// One unit of conversation content.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// The unique, stable id of this message.
    pub id: MessageId,
    /// What this message represents.
    pub kind: MessageKind,
    /// Accumulated text, for `Chunk` and `Complete` messages.
    pub text: String,
    /// The tool name, for `ToolUse` messages.
    pub tool_name: Option<String>,
    /// The accumulated tool input, for `ToolUse` messages.
    pub tool_input: Option<ToolInput>,
    /// The upstream tool call id, when the backend provided one.
    pub tool_id: Option<String>,
    /// Accumulated reasoning text, for `Reasoning` messages.
    pub reasoning_text: String,
    /// The failure text, for `Error` messages.
    pub error_text: String,
    /// Whether a `complete` event has finalized this message.
    pub is_complete: bool,
    /// Whether the message came from the user. Set at creation,
    /// never mutated.
    pub is_from_user: bool,
    /// When the message was created; refreshed on each append for
    /// display purposes only, never used for ordering.
    pub created_at: SystemTime,
}

/// The caller-provided part of a new message.
#[derive(Clone, Debug, Default)]
pub struct MessageDraft {
    kind: Option<MessageKind>,
    text: String,
    tool_name: Option<String>,
    tool_input: Option<ToolInput>,
    tool_id: Option<String>,
    reasoning_text: String,
    error_text: String,
    is_from_user: bool,
}

impl MessageDraft {
    /// A streamed text message from the agent.
    pub fn chunk<S: Into<String>>(text: S) -> Self {
        Self {
            kind: Some(MessageKind::Chunk),
            text: text.into(),
            ..Default::default()
        }
    }

    /// A text message entered by the user.
    pub fn user_chunk<S: Into<String>>(text: S) -> Self {
        Self {
            is_from_user: true,
            ..Self::chunk(text)
        }
    }

    /// A tool invocation message.
    pub fn tool_use(tool: ToolUse) -> Self {
        Self {
            kind: Some(MessageKind::ToolUse),
            tool_name: Some(tool.name),
            tool_input: Some(tool.input),
            tool_id: tool.id,
            ..Default::default()
        }
    }

    /// A reasoning message.
    pub fn reasoning<S: Into<String>>(text: S) -> Self {
        Self {
            kind: Some(MessageKind::Reasoning),
            reasoning_text: text.into(),
            ..Default::default()
        }
    }

    /// An already-finalized response message.
    pub fn complete<S: Into<String>>(text: S) -> Self {
        Self {
            kind: Some(MessageKind::Complete),
            text: text.into(),
            ..Default::default()
        }
    }

    /// An error message.
    pub fn error<S: Into<String>>(text: S) -> Self {
        Self {
            kind: Some(MessageKind::Error),
            error_text: text.into(),
            ..Default::default()
        }
    }
}

/// The ordered, mutable collection of messages for the current
/// conversation.
///
/// All operations are total: "not found" is an expected outcome
/// reported through return values, never an error.
#[derive(Debug, Default)]
pub struct MessageStore {
    items: Vec<Message>,
    next_seq: u64,
    revision: u64,
}

impl MessageStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new message built from the draft, returning its id.
    ///
    /// Ids combine the creation time with a per-store sequence
    /// number, so they never collide within a store instance.
    pub fn add(&mut self, draft: MessageDraft) -> MessageId {
        let seq = self.next_seq;
        self.next_seq += 1;

        let created_at = SystemTime::now();
        let millis = created_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let id = MessageId(format!("msg-{millis}-{seq}"));

        self.items.push(Message {
            id: id.clone(),
            kind: draft.kind.unwrap_or(MessageKind::Chunk),
            text: draft.text,
            tool_name: draft.tool_name,
            tool_input: draft.tool_input,
            tool_id: draft.tool_id,
            reasoning_text: draft.reasoning_text,
            error_text: draft.error_text,
            is_complete: false,
            is_from_user: draft.is_from_user,
            created_at,
        });
        self.revision += 1;
        id
    }

    /// Applies `patch` to the message with the given id.
    ///
    /// Returns `false` (leaving the store untouched) when no such
    /// message exists.
    pub fn update<F>(&mut self, id: &MessageId, patch: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        let Some(msg) = self.items.iter_mut().find(|m| &m.id == id) else {
            return false;
        };
        patch(msg);
        self.revision += 1;
        true
    }

    /// Concatenates `text` onto the message's text, refreshing its
    /// timestamp.
    ///
    /// A missing id means the store was cleared while a stream was
    /// still delivering fragments; the fragment is dropped and the
    /// drop is logged.
    pub fn append_text(&mut self, id: &MessageId, text: &str) -> bool {
        let appended = self.update(id, |msg| {
            msg.text.push_str(text);
            msg.created_at = SystemTime::now();
        });
        if !appended {
            warn!("dropping text fragment for missing message {id}");
        }
        appended
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.items.clear();
        self.revision += 1;
    }

    /// Looks up a message by id.
    #[inline]
    pub fn find(&self, id: &MessageId) -> Option<&Message> {
        self.items.iter().find(|m| &m.id == id)
    }

    /// The messages, in insertion order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.items
    }

    /// A counter bumped on every mutation, for change detection.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store holds no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
