use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use robochat_model::{ErrorKind, EventStream, StreamEvent};
use robochat_wire::{ChunksError, FrameReader};

use crate::Error;

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = (Result<Option<StreamEvent>, ChunksError>, FrameReader);

pin_project! {
    /// The event stream of one SSE turn.
    pub struct SseEventStream {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
        pending_error: Option<String>,
    }
}

impl SseEventStream {
    pub(crate) fn from_reader(reader: FrameReader) -> Self {
        Self {
            next_event_fut: Some(next_event_fut(reader)),
            pending_error: None,
        }
    }

    /// A stream that reports the given failure as its only event.
    pub(crate) fn failed<S: Into<String>>(message: S) -> Self {
        Self {
            next_event_fut: None,
            pending_error: Some(message.into()),
        }
    }
}

impl EventStream for SseEventStream {
    type Error = Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<StreamEvent>, Self::Error>> {
        let this = self.project();

        if let Some(message) = this.pending_error.take() {
            *this.next_event_fut = None;
            return Poll::Ready(Ok(Some(StreamEvent::Error(message))));
        }

        let Some(fut) = this.next_event_fut else {
            // The stream has been exhausted.
            return Poll::Ready(Ok(None));
        };

        match ready!(fut.as_mut().poll(cx)) {
            (Ok(Some(event)), reader) => {
                *this.next_event_fut = Some(next_event_fut(reader));
                Poll::Ready(Ok(Some(event)))
            }
            (Ok(None), _) => {
                *this.next_event_fut = None;
                Poll::Ready(Ok(None))
            }
            (Err(err), _) => {
                *this.next_event_fut = None;
                Poll::Ready(Err(Error::new(
                    format!("{err}"),
                    ErrorKind::Other,
                )))
            }
        }
    }
}

fn next_event_fut(mut reader: FrameReader) -> PinnedFuture<NextEvent> {
    Box::pin(async move {
        let event = reader.next_event().await;
        (event, reader)
    })
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use robochat_wire::Chunks;

    use super::*;

    #[tokio::test]
    async fn test_relays_parsed_events() {
        let chunks = Chunks::from_chunks([Bytes::from_static(
            b"data: {\"type\":\"chunk\",\"data\":\"hi\"}\n",
        )]);
        let stream = SseEventStream::from_reader(FrameReader::new(chunks));
        let mut stream = pin!(stream);
        let event = poll_fn(|cx| stream.as_mut().poll_next_event(cx))
            .await
            .unwrap();
        assert_eq!(event, Some(StreamEvent::Chunk("hi".to_owned())));
        let event = poll_fn(|cx| stream.as_mut().poll_next_event(cx))
            .await
            .unwrap();
        assert_eq!(event, None);
    }

    #[tokio::test]
    async fn test_failed_stream_yields_one_error() {
        let stream = SseEventStream::failed("connection refused");
        let mut stream = pin!(stream);
        let event = poll_fn(|cx| stream.as_mut().poll_next_event(cx))
            .await
            .unwrap();
        assert_eq!(
            event,
            Some(StreamEvent::Error("connection refused".to_owned()))
        );
        let event = poll_fn(|cx| stream.as_mut().poll_next_event(cx))
            .await
            .unwrap();
        assert_eq!(event, None);
    }
}
