use robochat_model::StreamEvent;

use crate::chunks::{Chunks, ChunksError};
use crate::proto::WireFrame;

const DATA_PREFIX: &str = "data: ";

/// A reader that reassembles streamed `data:` frames into events.
///
/// The reader buffers raw bytes across chunk boundaries and only
/// splits at newlines, so a frame torn at any byte offset (even in
/// the middle of the `data: ` prefix or a UTF-8 sequence) is parsed
/// exactly as if it had arrived whole.
pub struct FrameReader {
    buf: Vec<u8>,
    chunks: Chunks,
    closed: bool,
}

impl FrameReader {
    /// Creates a reader over the given chunk source.
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            closed: false,
        }
    }

    /// Reads the next event, or `None` when the turn is over.
    ///
    /// The turn is over when the source reports end of stream, or
    /// when a `complete` frame is observed. In the latter case the
    /// underlying source is closed proactively, because the server
    /// may keep the connection open after the final frame.
    pub async fn next_event(
        &mut self,
    ) -> Result<Option<StreamEvent>, ChunksError> {
        loop {
            if let Some(event) = self.next_buffered_event() {
                return Ok(Some(event));
            }
            if self.closed {
                return Ok(None);
            }

            match self.chunks.next_chunk().await? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => {
                    if !self.buf.is_empty() {
                        debug!(
                            "discarding {} trailing bytes without a newline",
                            self.buf.len()
                        );
                    }
                    self.closed = true;
                    return Ok(None);
                }
            }
        }
    }

    /// Drains complete lines from the buffer until one of them
    /// decodes to an event. The trailing partial line stays buffered.
    fn next_buffered_event(&mut self) -> Option<StreamEvent> {
        while let Some(eol) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=eol).collect();
            let line = String::from_utf8_lossy(&line[..eol]);
            let Some(event) = decode_line(&line) else {
                continue;
            };
            if matches!(event, StreamEvent::Complete { .. }) {
                // Frames buffered behind `complete` must never be
                // delivered.
                self.closed = true;
                self.buf.clear();
                self.chunks.close();
            }
            return Some(event);
        }
        None
    }
}

/// Decodes one complete line, or `None` if the line carries nothing.
fn decode_line(line: &str) -> Option<StreamEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Some(payload) = trimmed.strip_prefix(DATA_PREFIX) else {
        trace!("skipping non-data line: {trimmed}");
        return None;
    };

    match serde_json::from_str::<WireFrame>(payload) {
        Ok(frame) => frame.into_event(),
        Err(err) => {
            // A truncated or non-JSON payload must not kill the
            // stream; surface the raw text as chunk content instead.
            warn!("failed to parse frame payload: {err}");
            let raw = payload.trim();
            if raw.is_empty() {
                None
            } else {
                Some(StreamEvent::Chunk(raw.to_owned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn reader(chunks: impl IntoIterator<Item = &'static [u8]>) -> FrameReader {
        FrameReader::new(Chunks::from_chunks(
            chunks.into_iter().map(Bytes::from_static),
        ))
    }

    async fn collect(mut reader: FrameReader) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = reader.next_event().await.unwrap() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_normal_events() {
        let reader = reader([
            b"data: {\"type\":\"chunk\",\"data\":\"Hel\"}\n".as_slice(),
            b"data: {\"type\":\"chunk\",\"data\":\"lo\"}\n",
        ]);
        assert_eq!(
            collect(reader).await,
            vec![
                StreamEvent::Chunk("Hel".to_owned()),
                StreamEvent::Chunk("lo".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn test_multiple_frames_in_one_chunk() {
        let reader = reader([
            b"data: {\"type\":\"chunk\",\"data\":\"a\"}\n\
              data: {\"type\":\"chunk\",\"data\":\"b\"}\n"
                .as_slice(),
        ]);
        assert_eq!(
            collect(reader).await,
            vec![
                StreamEvent::Chunk("a".to_owned()),
                StreamEvent::Chunk("b".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn test_frame_split_mid_payload() {
        let reader = reader([
            b"data: {\"typ".as_slice(),
            b"e\":\"chunk\",\"data\":\"hi\"}\n",
        ]);
        assert_eq!(
            collect(reader).await,
            vec![StreamEvent::Chunk("hi".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_frame_split_at_data_prefix() {
        let reader = reader([
            b"data".as_slice(),
            b": ",
            b"{\"type\":\"chunk\",\"data\":\"hi\"}\n",
        ]);
        assert_eq!(
            collect(reader).await,
            vec![StreamEvent::Chunk("hi".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_empty_and_foreign_lines_ignored() {
        let reader = reader([
            b"\n\nretry: 1000\n: comment\n\
              data: {\"type\":\"chunk\",\"data\":\"hi\"}\n"
                .as_slice(),
        ]);
        assert_eq!(
            collect(reader).await,
            vec![StreamEvent::Chunk("hi".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_degrades_to_chunk() {
        let reader = reader([
            b"data: {\"type\":\"chunk\",\"data\":\"hi\"\n".as_slice(),
        ]);
        assert_eq!(
            collect(reader).await,
            vec![StreamEvent::Chunk(
                "{\"type\":\"chunk\",\"data\":\"hi\"".to_owned()
            )]
        );
    }

    #[tokio::test]
    async fn test_complete_closes_the_stream() {
        // Frames after `complete` must never be delivered, even when
        // they are already buffered.
        let reader = reader([
            b"data: {\"type\":\"complete\",\"final_response\":\"done\"}\n\
              data: {\"type\":\"chunk\",\"data\":\"late\"}\n"
                .as_slice(),
        ]);
        assert_eq!(
            collect(reader).await,
            vec![StreamEvent::Complete {
                final_response: "done".to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn test_stream_end_without_complete() {
        let reader = reader([
            b"data: {\"type\":\"chunk\",\"data\":\"partial\"}\n".as_slice(),
            b"data: {\"type\":\"chunk\",\"data\":\"tail with no newline\"}",
        ]);
        // The unterminated trailing line is dropped, matching the
        // upstream client behavior.
        assert_eq!(
            collect(reader).await,
            vec![StreamEvent::Chunk("partial".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_full_turn_fixture() {
        let reader = reader([include_bytes!("fixtures/turn.txt").as_slice()]);
        let events = collect(reader).await;
        assert_eq!(events.len(), 7);
        assert!(matches!(events[0], StreamEvent::Reasoning(_)));
        assert!(matches!(
            events[1],
            StreamEvent::ToolUse(_) | StreamEvent::Chunk(_)
        ));
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Complete { .. })
        ));
    }
}
