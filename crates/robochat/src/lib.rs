//! A small chat client for robot-controlling agent backends.
//!
//! The heavy lifting lives in the companion crates; this one ties a
//! transport to a message store behind a [`Session`] and ships a
//! terminal chat program on top of it.

#[macro_use]
extern crate tracing;

mod session;

pub use robochat_core::{
    Message, MessageKind, MessageStore, TurnOutcome, run_turn,
};
pub use robochat_model::{AgentTransport, StreamEvent};
pub use session::{GREETING, Session};
