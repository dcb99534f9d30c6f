use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display};

use bytes::Bytes;
use reqwest::Response;

/// The error returned when the underlying connection fails mid-read.
#[derive(Debug, PartialEq, Eq)]
pub struct ChunksError {
    message: String,
}

impl ChunksError {
    /// Returns the failure message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ChunksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for ChunksError {}

/// An adapter for streaming byte chunks.
///
/// The `Scripted` variant replays a fixed sequence of chunks and is
/// used by tests to exercise arbitrary network split points.
pub enum Chunks {
    /// Chunks read from an HTTP response body.
    Response(Response),
    /// Chunks replayed from memory.
    Scripted(VecDeque<Bytes>),
    /// The source has been closed; no further chunks are produced.
    Closed,
}

impl Chunks {
    /// Wraps an HTTP response body.
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Response(response)
    }

    /// Replays the given chunks in order.
    #[inline]
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        Chunks::Scripted(chunks.into_iter().collect())
    }

    /// Reads the next chunk, or `None` at end of stream.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, ChunksError> {
        match self {
            Chunks::Response(response) => match response.chunk().await {
                Ok(chunk) => Ok(chunk),
                Err(err) => Err(ChunksError {
                    message: format!("{err}"),
                }),
            },
            Chunks::Scripted(chunks) => Ok(chunks.pop_front()),
            Chunks::Closed => Ok(None),
        }
    }

    /// Drops the underlying source.
    ///
    /// For HTTP responses this releases the connection even if the
    /// server intends to keep it open. Subsequent reads report end of
    /// stream.
    #[inline]
    pub fn close(&mut self) {
        *self = Chunks::Closed;
    }
}
