//! Round lifecycle state machine.
//!
//! Owns the phase machine (Submission → Voting → Cooldown → Submission),
//! the participant/voter registries, the per-round prize pool and the
//! permanent treasury, vote tallying, and the end-of-round winner payout
//! including the treasury bonus lottery.

mod lottery;
mod payout;
mod state;

pub use lottery::BonusLottery;
pub use payout::{prize_payouts, voter_shares};
pub use state::LifecycleState;
