//! Action types for the deterministic state machine.

use crate::{Announcement, Event, Notice, TimerId};
use storypool_types::{Reference, UserId, WalletAddress};
use std::time::Duration;

/// Correlates a token transfer with what it pays for.
///
/// Only the contributor's own payout leg feeds a result back into the
/// state machine; prize and voter-share legs are best-effort (per-leg
/// failures are logged by the runner and never block the round).
#[derive(Debug, Clone)]
pub enum TransferContext {
    /// The contributor's share of a purchase. The runner reports the
    /// outcome via [`Event::UserTransferCompleted`].
    UserPayout { reference: Reference, user_id: UserId },
    /// A ranked winner's prize at the end of a round. Fire-and-forget.
    PrizePayout { user_id: UserId, rank: usize },
    /// A voter-pool share at the end of a round. Fire-and-forget.
    VoterShare { user_id: UserId },
}

/// Actions the state machine wants to perform.
///
/// Actions are **commands** - they describe something to do.
/// The runner executes actions and may convert results back into events.
#[derive(Debug, Clone)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// Set a timer to fire after a duration.
    SetTimer { id: TimerId, duration: Duration },

    /// Cancel a previously set timer.
    CancelTimer { id: TimerId },

    // ═══════════════════════════════════════════════════════════════════════
    // Internal (fed back as events with Internal priority)
    // ═══════════════════════════════════════════════════════════════════════
    /// Enqueue an internal event for immediate processing.
    ///
    /// Internal events are processed at the same timestamp with higher
    /// priority than external events, preserving causality.
    EnqueueInternal { event: Event },

    // ═══════════════════════════════════════════════════════════════════════
    // Delegated External I/O (async, may return a callback event)
    // ═══════════════════════════════════════════════════════════════════════
    /// Buy the pooled reward token with the post-fee contribution amount.
    ///
    /// The runner applies bounded retries with backoff; at most one buy is
    /// issued per pipeline invocation. Returns
    /// [`Event::MarketBuyCompleted`] when done.
    MarketBuy { reference: Reference, amount: f64 },

    /// Send the fee cut to the fee destination. Best-effort: a failure is
    /// logged and never aborts the flow. No callback.
    SendFee { amount: f64 },

    /// Transfer tokens to a wallet. Whether a callback event is produced
    /// depends on the [`TransferContext`].
    TransferTokens {
        wallet: WalletAddress,
        tokens: u64,
        context: TransferContext,
    },

    /// Query the treasury account balance (cold-start seeding only).
    /// Returns [`Event::TreasuryBalanceFetched`].
    QueryTreasuryBalance,

    // ═══════════════════════════════════════════════════════════════════════
    // External Notifications (fire-and-forget, failures are logged)
    // ═══════════════════════════════════════════════════════════════════════
    /// Send a direct notice to one user.
    NotifyUser { user_id: UserId, notice: Notice },

    /// Publish an announcement on the public channel.
    Announce { announcement: Announcement },

    // ═══════════════════════════════════════════════════════════════════════
    // Persistence
    // ═══════════════════════════════════════════════════════════════════════
    /// Persist the current engine snapshot. The runner pulls the snapshot
    /// from the state machine and writes it atomically; a write failure is
    /// logged and the process continues with in-memory state.
    PersistSnapshot,
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::EnqueueInternal { .. } => "EnqueueInternal",
            Action::MarketBuy { .. } => "MarketBuy",
            Action::SendFee { .. } => "SendFee",
            Action::TransferTokens { .. } => "TransferTokens",
            Action::QueryTreasuryBalance => "QueryTreasuryBalance",
            Action::NotifyUser { .. } => "NotifyUser",
            Action::Announce { .. } => "Announce",
            Action::PersistSnapshot => "PersistSnapshot",
        }
    }
}
