//! Core types for the storypool round engine.
//!
//! This crate provides the foundational types for the engine architecture:
//!
//! - [`Event`]: All possible inputs to the state machine
//! - [`Action`]: All possible outputs from the state machine
//! - [`EventPriority`]: Ordering priority for events at the same timestamp
//! - [`StateMachine`]: The trait that the engine implements
//!
//! # Architecture
//!
//! The engine is built on a simple event-driven model:
//!
//! ```text
//! Events → StateMachine::handle() → Actions
//! ```
//!
//! The state machine is:
//! - **Synchronous**: No async, no .await
//! - **Deterministic**: Same state + event = same actions
//! - **Pure-ish**: Mutates self, but performs no I/O
//!
//! All I/O is handled by the runner (simulation or production) which:
//! 1. Delivers events to the state machine, one at a time
//! 2. Executes the returned actions
//! 3. Converts action results back into events
//!
//! Because exactly one event is being handled at any instant, every
//! mutation of round state is serialized through the event loop; slow
//! external calls (market buy, token transfer) happen in the runner and
//! come back as callback events.

mod action;
mod event;
mod message;
mod traits;

pub use action::{Action, TransferContext};
pub use event::{Event, EventPriority};
pub use message::{Announcement, Notice, WinnerResult};
pub use traits::StateMachine;

/// Identifies a scheduled timer.
///
/// At most one timer per id is live at a time; setting an id cancels the
/// previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Fires at the Submission phase deadline.
    Submission,
    /// Fires at the Voting phase deadline.
    Voting,
    /// Fires at the Cooldown phase deadline.
    Cooldown,
    /// Periodic expiry sweep of unconfirmed payment intents.
    Sweep,
}
