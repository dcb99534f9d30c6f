//! Core logic: the message store, the event-to-message reducer, and
//! the turn driver that connects a transport stream to the store.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod reducer;
pub mod store;
mod turn;

pub use reducer::TurnReducer;
pub use store::{Message, MessageDraft, MessageId, MessageKind, MessageStore};
pub use turn::{TurnOutcome, run_turn};
