use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use robochat_model::{EventStream, StreamEvent};
use robochat_wire::{ChunksError, FrameReader};

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = (Result<Option<StreamEvent>, ChunksError>, FrameReader);

pin_project! {
    /// The event stream of one managed-runtime turn.
    ///
    /// All failures occurring once the call is in flight are
    /// delivered in-band as a single [`StreamEvent::Error`], so the
    /// consumer has one failure path regardless of what went wrong.
    pub struct RuntimeEventStream {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
        pending_error: Option<String>,
    }
}

impl RuntimeEventStream {
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

impl EventStream for RuntimeEventStream {
    type Error = crate::Error;

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
                // The reader may still have more frames, queue up the
                // next read.
                *this.next_event_fut = Some(next_event_fut(reader));
                Poll::Ready(Ok(Some(event)))
            }
            (Ok(None), _) => {
                *this.next_event_fut = None;
                Poll::Ready(Ok(None))
            }
            (Err(err), _) => {
                error!("runtime stream read failed: {err}");
                *this.next_event_fut = None;
                Poll::Ready(Ok(Some(StreamEvent::Error(
                    err.message().to_owned(),
                ))))
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

    async fn collect(stream: RuntimeEventStream) -> Vec<StreamEvent> {
        let mut stream = pin!(stream);
        let mut events = Vec::new();
        while let Some(event) =
            poll_fn(|cx| stream.as_mut().poll_next_event(cx))
                .await
                .unwrap()
        {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_relays_parsed_events() {
        let chunks = Chunks::from_chunks([Bytes::from_static(
            b"data: {\"type\":\"chunk\",\"data\":\"hi\"}\n\
              data: {\"type\":\"complete\",\"final_response\":\"hi\"}\n",
        )]);
        let stream =
            RuntimeEventStream::from_reader(FrameReader::new(chunks));
        let events = collect(stream).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Chunk("hi".to_owned()),
                StreamEvent::Complete {
                    final_response: "hi".to_owned(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_stream_yields_one_error() {
        let stream = RuntimeEventStream::failed("credentials expired");
        let events = collect(stream).await;
        assert_eq!(
            events,
            vec![StreamEvent::Error("credentials expired".to_owned())]
        );
    }
}
