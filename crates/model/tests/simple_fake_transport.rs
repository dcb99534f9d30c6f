use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use robochat_model::{
    AgentTransport, ErrorKind, EventStream, StreamEvent, TransportError,
    TurnRequest,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct FakeTransportError(ErrorKind);

impl Display for FakeTransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeTransportError {}

impl TransportError for FakeTransportError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

#[derive(Debug)]
struct FakeEventStream {
    fake_items: VecDeque<String>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl FakeEventStream {
    fn new(input: &str) -> Self {
        let fake_items = format!("You said {}", input)
            .split(" ")
            .map(ToString::to_string)
            .collect();
        Self {
            fake_items,
            sleep: None,
        }
    }
}

impl EventStream for FakeEventStream {
    type Error = FakeTransportError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<StreamEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if let Some(mut this_item) = this.fake_items.pop_front() {
                let need_space = !this.fake_items.is_empty();
                if need_space {
                    this_item.push(' ');
                }
                return Poll::Ready(Ok(Some(StreamEvent::Chunk(this_item))));
            }

            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

struct FakeTransport;

impl AgentTransport for FakeTransport {
    type Error = FakeTransportError;
    type Stream = FakeEventStream;

    fn send_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static
    {
        let result = 'blk: {
            if req.prompt.is_empty() {
                break 'blk Err(FakeTransportError(ErrorKind::Other));
            }

            Ok(FakeEventStream::new(&req.prompt))
        };
        ready(result)
    }
}

mod tests {
    use std::future::poll_fn;

    use super::*;

    #[tokio::test]
    async fn test_streamed_turn() {
        let transport = FakeTransport;
        let req = TurnRequest::new("Good morning", "session-1");
        let mut stream = transport.send_turn(&req).await.unwrap();

        let mut text = String::new();
        loop {
            let event_fut =
                poll_fn(|cx| Pin::new(&mut stream).poll_next_event(cx));
            match event_fut.await {
                Ok(Some(event)) => match event {
                    StreamEvent::Chunk(delta) => {
                        text.push_str(&delta);
                    }
                    StreamEvent::Complete { .. } => {
                        break;
                    }
                    _ => unreachable!("unexpected event: {event:?}"),
                },
                Ok(None) => break,
                Err(err) => unreachable!("unexpected error: {err:?}"),
            }
        }

        assert_eq!(text, "You said Good morning");
    }

    #[tokio::test]
    async fn test_error() {
        let transport = FakeTransport;
        let req = TurnRequest::new("", "session-1");
        let result = transport.send_turn(&req).await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
