//! State machine trait.

use crate::{Action, Event};
use std::time::Duration;

/// The deterministic engine interface.
///
/// Implementations mutate themselves and return the actions the runner
/// must execute. They never perform I/O and never block.
pub trait StateMachine {
    /// Process one event and return the resulting actions.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Advance the machine's notion of "now" (duration since the unix
    /// epoch). The runner calls this before every `handle`.
    fn set_time(&mut self, now: Duration);
}
