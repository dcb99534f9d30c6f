//! An abstraction layer for the agent streaming protocol.
//!
//! This crate establishes a unified contract between the transports
//! (which obtain a streamed response from some agent backend) and the
//! consumers (which fold the streamed events into visible messages),
//! so that either side can be swapped without modifying the other.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.
//!
//! Users of this crate may add some extra functionalities or wrappers,
//! depending on their own use cases. Those extra code should be placed
//! in their own crate.

#![deny(missing_docs)]

mod credentials;
mod error;
mod event;
mod transport;

pub use credentials::*;
pub use error::*;
pub use event::*;
pub use transport::*;
