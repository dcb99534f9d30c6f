//! A scripted fake transport for testing purpose.
//!
//! Scripts are plain [`StreamEvent`] sequences, optionally ending in
//! an injected failure, and optionally paced with a small delay so
//! that consumers exercise their `Pending` paths.
//!
//! # Note
//!
//! This type is not optimized for production use, there are heavy
//! memory copies involved. You should only use it for testing.

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use robochat_model::{
    AgentTransport, ErrorKind, EventStream, StreamEvent, TransportError,
    TurnRequest,
};
use tokio::time::{Sleep, sleep};

/// The error produced by scripted failures.
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl TransportError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A stream that replays a fixed sequence of events.
pub struct PresetStream {
    events: VecDeque<StreamEvent>,
    fail_with: Option<String>,
    delay: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
    done: bool,
}

impl PresetStream {
    /// Creates a stream that yields the given events in order.
    pub fn with_events(
        events: impl IntoIterator<Item = StreamEvent>,
    ) -> Self {
        Self {
            events: events.into_iter().collect(),
            fail_with: None,
            delay: None,
            sleep: None,
            done: false,
        }
    }

    /// Makes the stream fail with the given message after all events
    /// have been delivered, instead of ending cleanly.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Adds a delay before each event.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl EventStream for PresetStream {
    type Error = Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<StreamEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if this.done {
            return Poll::Ready(Ok(None));
        }

        if let Some(delay) = this.delay {
            let sleep_fut =
                this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
            ready!(sleep_fut.as_mut().poll(cx));
            this.sleep = None;
        }

        if let Some(event) = this.events.pop_front() {
            return Poll::Ready(Ok(Some(event)));
        }

        this.done = true;
        if let Some(message) = this.fail_with.take() {
            return Poll::Ready(Err(Error::new(message, ErrorKind::Other)));
        }
        Poll::Ready(Ok(None))
    }
}

/// One scripted turn for [`TestTransport`].
enum PresetTurn {
    Stream(PresetStream),
    SendFailure(Error),
}

/// A fake transport that hands out scripted turns in order.
///
/// Each call to `send_turn` consumes the next scripted turn. When
/// the script runs out, the call fails.
#[derive(Clone, Default)]
pub struct TestTransport {
    turns: Arc<Mutex<VecDeque<PresetTurn>>>,
}

impl TestTransport {
    /// Appends a scripted turn.
    pub fn add_turn(&self, stream: PresetStream) {
        self.turns
            .lock()
            .unwrap()
            .push_back(PresetTurn::Stream(stream));
    }

    /// Appends a turn whose `send_turn` call fails outright, the way
    /// a configuration error would.
    pub fn add_send_failure(
        &self,
        message: impl Into<String>,
        kind: ErrorKind,
    ) {
        self.turns
            .lock()
            .unwrap()
            .push_back(PresetTurn::SendFailure(Error::new(message, kind)));
    }
}

impl AgentTransport for TestTransport {
    type Error = Error;
    type Stream = PresetStream;

    fn send_turn(
        &self,
        _req: &TurnRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static
    {
        let next = self.turns.lock().unwrap().pop_front();
        ready(match next {
            Some(PresetTurn::Stream(stream)) => Ok(stream),
            Some(PresetTurn::SendFailure(err)) => Err(err),
            None => {
                Err(Error::new("no more scripted turns", ErrorKind::Other))
            }
        })
    }
}
