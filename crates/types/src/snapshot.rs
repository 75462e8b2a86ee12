//! The persisted crash-recovery unit.

use crate::{Participant, PaymentIntent, RoundPhase, Voter};
use serde::{Deserialize, Serialize};

/// Complete serializable engine state.
///
/// Saved after every mutation batch and loaded on process start. Phase
/// deadlines are stored as absolute timestamps so a restart can resume the
/// remaining delay instead of replaying a full-length phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub phase: RoundPhase,
    /// Absolute deadline of the current phase, ms since the unix epoch.
    pub deadline_ms: u64,
    /// When the current round's Submission phase opened, ms since epoch.
    pub round_started_at_ms: u64,
    /// Per-round prize pool, reset to zero at every winner announcement.
    pub round_pool: u64,
    /// Cross-round treasury funding the bonus lottery.
    pub treasury: u64,
    /// Whether the treasury has been seeded from the balance query.
    pub treasury_seeded: bool,
    pub participants: Vec<Participant>,
    pub voters: Vec<Voter>,
    pub intents: Vec<PaymentIntent>,
}
