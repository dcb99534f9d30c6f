//! Decoding of the agent's streamed wire format.
//!
//! The backend streams newline-delimited lines of the form
//! `data: {json}`. This crate turns a raw byte-chunk stream into
//! [`StreamEvent`](robochat_model::StreamEvent) values, regardless of
//! how the network happened to split the bytes: partial lines are
//! buffered across chunk boundaries, several frames in one chunk are
//! delivered in order, and malformed payloads degrade to plain text
//! instead of tearing down the stream.

#[macro_use]
extern crate tracing;

mod chunks;
mod frame;
pub mod proto;

pub use chunks::{Chunks, ChunksError};
pub use frame::FrameReader;
