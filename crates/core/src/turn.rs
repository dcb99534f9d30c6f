use std::future::poll_fn;
use std::pin::pin;

use robochat_model::{EventStream, StreamEvent};

use crate::reducer::TurnReducer;
use crate::store::MessageStore;

/// How a turn ended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The final response text, when the backend sent a `complete`
    /// event.
    pub final_response: Option<String>,
    /// Whether a `complete` event was observed. A stream that just
    /// closes leaves this `false`; no completion is invented.
    pub completed: bool,
    /// Whether the turn ended with an error message.
    pub errored: bool,
}

/// Drives one streamed turn to its end, folding every event into the
/// store through a fresh [`TurnReducer`].
///
/// This is the single consumer of a stream: events are applied
/// synchronously, in arrival order, with no buffering between the
/// stream and the store. Stream-level failures are converted to an
/// in-band error event so that every failure after the turn started
/// renders through the same path.
///
/// `on_event` observes each event (including the synthesized error)
/// before it is applied; use it for logging or live display.
///
/// # Cancel safety
///
/// Dropping the returned future stops the stream; messages already
/// applied to the store are kept.
pub async fn run_turn<S, F>(
    stream: S,
    store: &mut MessageStore,
    mut on_event: F,
) -> TurnOutcome
where
    S: EventStream,
    F: FnMut(&StreamEvent),
{
    let mut reducer = TurnReducer::new();
    let mut outcome = TurnOutcome::default();
    let mut stream = pin!(stream);

    loop {
        let event =
            match poll_fn(|cx| stream.as_mut().poll_next_event(cx)).await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(err) => {
                    error!("turn stream failed: {err}");
                    StreamEvent::Error(err.to_string())
                }
            };
        trace!("got an event: {event:?}");
        on_event(&event);

        match &event {
            StreamEvent::Complete { final_response } => {
                outcome.final_response = Some(final_response.clone());
                outcome.completed = true;
            }
            StreamEvent::Error(_) => {
                outcome.errored = true;
            }
            _ => {}
        }
        reducer.apply(store, event);

        // `complete` and `error` both end the turn; don't wait for
        // the transport to notice.
        if reducer.is_finished() {
            break;
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use robochat_model::{ToolInput, ToolUse};
    use robochat_test_transport::PresetStream;

    use super::*;
    use crate::store::MessageKind;

    #[tokio::test]
    async fn test_chunked_turn_ends_complete() {
        let stream = PresetStream::with_events([
            StreamEvent::Chunk("Hel".to_owned()),
            StreamEvent::Chunk("lo".to_owned()),
            StreamEvent::Complete {
                final_response: "Hello".to_owned(),
            },
        ]);
        let mut store = MessageStore::new();
        let outcome = run_turn(stream, &mut store, |_| {}).await;

        assert!(outcome.completed);
        assert_eq!(outcome.final_response.as_deref(), Some("Hello"));
        assert_eq!(store.len(), 1);
        let msg = &store.messages()[0];
        assert_eq!(msg.kind, MessageKind::Complete);
        assert_eq!(msg.text, "Hello");
        assert!(msg.is_complete);
    }

    #[tokio::test]
    async fn test_tool_turn() {
        let tool = |input: &str| {
            StreamEvent::ToolUse(ToolUse {
                name: "move".to_owned(),
                input: ToolInput::Text(input.to_owned()),
                id: Some("tool-1".to_owned()),
            })
        };
        let stream = PresetStream::with_events([tool("for"), tool("ward")]);
        let mut store = MessageStore::new();
        let outcome = run_turn(stream, &mut store, |_| {}).await;

        assert!(!outcome.completed);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.messages()[0].tool_input,
            Some(ToolInput::Text("forward".to_owned()))
        );
    }

    #[tokio::test]
    async fn test_stream_failure_degrades_to_error_message() {
        let stream = PresetStream::with_events([StreamEvent::Chunk(
            "partial".to_owned(),
        )])
        .failing_with("connection reset");
        let mut store = MessageStore::new();
        let outcome = run_turn(stream, &mut store, |_| {}).await;

        assert!(outcome.errored);
        assert!(!outcome.completed);
        assert_eq!(store.len(), 1);
        let msg = &store.messages()[0];
        assert_eq!(msg.kind, MessageKind::Error);
        assert_eq!(msg.error_text, "connection reset");
        assert_eq!(msg.text, "partial");
    }

    #[tokio::test]
    async fn test_stream_end_without_complete() {
        let stream = PresetStream::with_events([
            StreamEvent::Chunk("no ending".to_owned()),
        ]);
        let mut store = MessageStore::new();
        let outcome = run_turn(stream, &mut store, |_| {}).await;

        assert!(!outcome.completed);
        assert!(!outcome.errored);
        assert!(!store.messages()[0].is_complete);
    }

    #[tokio::test]
    async fn test_on_event_observes_every_event() {
        let stream = PresetStream::with_events([
            StreamEvent::Chunk("a".to_owned()),
            StreamEvent::Complete {
                final_response: "a".to_owned(),
            },
        ]);
        let mut store = MessageStore::new();
        let mut seen = 0;
        run_turn(stream, &mut store, |_| seen += 1).await;
        assert_eq!(seen, 2);
    }
}
