//! Combined engine state machine.
//!
//! Composes the payment pipeline and the round lifecycle into the single
//! [`StateMachine`](storypool_core::StateMachine) the runners drive.

mod state;

pub use state::NodeStateMachine;
