use std::pin::Pin;
use std::task::{self, Poll};

use serde::Serialize;

use crate::error::TransportError;
use crate::event::StreamEvent;

/// A streamed sequence of events for one turn.
///
/// This is the single typed channel between a transport and the
/// consumer: every event of the turn flows through `poll_next_event`,
/// in arrival order, with no reordering or speculation.
pub trait EventStream: Sized + Send + 'static {
    /// The error type that may be returned by the transport.
    type Error: TransportError;

    /// Attempts to pull out the next event from the stream.
    ///
    /// # Return value
    ///
    /// There are several possible return values, each indicating a
    /// distinct stream state:
    ///
    /// - `Poll::Pending` means that the stream is still waiting for
    ///   the next event. Implementations will ensure that the current
    ///   task will be notified when the next event may be ready.
    /// - `Poll::Ready(Ok(Some(event)))` means the stream has an event
    ///   to deliver, and may produce further events on subsequent
    ///   `poll_next_event` calls.
    /// - `Poll::Ready(Ok(None))` means the stream has ended, either
    ///   because the turn completed or because the underlying
    ///   connection closed.
    /// - `Poll::Ready(Err(error))` means an error occurred while
    ///   reading the stream.
    ///
    /// Calling this method after the stream ended should always
    /// return `None`.
    ///
    /// # Early termination
    ///
    /// Implementations must stop reading from the underlying
    /// connection once a [`StreamEvent::Complete`] event has been
    /// delivered, even if the server keeps the connection open.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<StreamEvent>, Self::Error>>;
}

/// One user-initiated request sent to the agent backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TurnRequest {
    /// The user's prompt text.
    pub prompt: String,
    /// The conversation session identifier.
    pub session_id: String,
    /// Whether the backend should emit debug detail.
    pub debug: bool,
    /// A unique identifier for this prompt.
    pub prompt_uuid: String,
    /// The user's IANA timezone name.
    pub user_timezone: String,
    /// How many previous turns the backend should consider.
    pub last_k_turns: u32,
}

impl TurnRequest {
    /// Creates a request with the given prompt and session, using the
    /// defaults the backend expects for the remaining fields.
    pub fn new<S: Into<String>>(prompt: S, session_id: S) -> Self {
        Self {
            prompt: prompt.into(),
            session_id: session_id.into(),
            debug: false,
            prompt_uuid: String::new(),
            user_timezone: "UTC".to_owned(),
            last_k_turns: 5,
        }
    }
}

/// A type that can open a streamed turn against an agent backend.
///
/// Once the transport is created, it should behave like a stateless
/// object. It can still have internal state, but callers should not
/// rely on it, and the transport should be prepared for being dropped
/// anytime.
///
/// # Failure semantics
///
/// Returning `Err` from [`send_turn`](AgentTransport::send_turn) is
/// reserved for failures detected before any stream exists (missing
/// configuration, for example), which callers surface as connection
/// status. Failures once the call is in flight must instead be
/// delivered in-band, as a single [`StreamEvent::Error`] on the
/// returned stream, so that consumers have exactly one failure path
/// for everything that happens after the turn started.
pub trait AgentTransport: Send + Sync {
    /// The error type that may be returned by the transport.
    type Error: TransportError;

    /// The stream type produced for each turn.
    type Stream: EventStream<Error = Self::Error>;

    /// Opens a new streamed turn for the given request.
    fn send_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static;
}
