use std::time::{SystemTime, UNIX_EPOCH};

use robochat_core::{MessageDraft, MessageStore, TurnOutcome, run_turn};
use robochat_model::{AgentTransport, StreamEvent, TurnRequest};

/// The message shown when a conversation starts or is reset.
pub const GREETING: &str =
    "Hello! I'm your robot assistant. What would you like me to do?";

/// A chat session, like a window that displays messages and has an
/// input box.
///
/// The session owns the conversation: it keeps the message store, the
/// backend session id, and the transport together, and drives one
/// streamed turn at a time. Turns are strictly sequential; a new
/// message is only sent after the previous turn has ended.
pub struct Session<T: AgentTransport> {
    transport: T,
    store: MessageStore,
    session_id: String,
    next_prompt_seq: u64,
    next_session_seq: u64,
}

impl<T: AgentTransport> Session<T> {
    /// Creates a session over the given transport, with a fresh
    /// session id and the greeting message in place.
    pub fn new(transport: T) -> Self {
        let mut store = MessageStore::new();
        store.add(MessageDraft::complete(GREETING));
        Self {
            transport,
            store,
            session_id: new_session_id(0),
            next_prompt_seq: 0,
            next_session_seq: 1,
        }
    }

    /// The backend session id of the current conversation.
    #[inline]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The conversation's message store.
    #[inline]
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Sends a user message and drives the resulting turn to its end.
    ///
    /// The user message is recorded first, so it stays in the
    /// conversation even when opening the turn fails. `on_event`
    /// observes each agent event as it arrives, before it is folded
    /// into the store.
    ///
    /// # Errors
    ///
    /// Fails only when the transport rejects the turn before a stream
    /// exists; failures after that point surface as error messages in
    /// the store instead.
    pub async fn send_message<F>(
        &mut self,
        text: &str,
        on_event: F,
    ) -> Result<TurnOutcome, T::Error>
    where
        F: FnMut(&StreamEvent),
    {
        self.store.add(MessageDraft::user_chunk(text));

        let mut req = TurnRequest::new(text, self.session_id.as_str());
        req.prompt_uuid =
            format!("prompt-{}-{}", unix_millis(), self.next_prompt_seq);
        self.next_prompt_seq += 1;

        debug!("sending turn {} for {}", req.prompt_uuid, self.session_id);
        let stream = self.transport.send_turn(&req).await?;
        Ok(run_turn(stream, &mut self.store, on_event).await)
    }

    /// Discards the conversation and starts a new one.
    ///
    /// The store is emptied, a new session id is generated so the
    /// backend does not resume the old context, and the greeting is
    /// put back.
    pub fn reset(&mut self) {
        self.store.clear();
        self.store.add(MessageDraft::complete(GREETING));
        self.session_id = new_session_id(self.next_session_seq);
        self.next_session_seq += 1;
        info!("conversation reset, new session {}", self.session_id);
    }
}

/// Ids combine the creation time with a sequence number, so a reset
/// within the same millisecond still changes the id.
fn new_session_id(seq: u64) -> String {
    format!("session-{}-{seq}", unix_millis())
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
