//! Event types for the deterministic state machine.

use storypool_types::{PaymentChoice, Reference, Settlement, UserId};

/// Priority levels for event ordering within the same timestamp.
///
/// Events at the same time are processed in priority order.
/// Lower values = higher priority (processed first).
///
/// This ensures causality is preserved: internal events (consequences of
/// processing an event) are handled before new external inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Internal events: consequences of prior event processing.
    Internal = 0,

    /// Timer events: scheduled by the engine itself.
    Timer = 1,

    /// Client events: external inputs (front-end, payment endpoint).
    Client = 2,
}

/// All possible events the engine can receive.
///
/// Events are **passive data** - they describe something that happened.
/// The state machine processes events and returns actions.
#[derive(Debug, Clone)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// Submission phase deadline reached.
    SubmissionTimer,

    /// Voting phase deadline reached; winners are announced.
    VotingTimer,

    /// Cooldown deadline reached; a new round opens.
    CooldownTimer,

    /// Periodic sweep of stale unconfirmed payment intents.
    SweepTimer,

    // ═══════════════════════════════════════════════════════════════════════
    // Client Inputs (priority: Client)
    // ═══════════════════════════════════════════════════════════════════════
    /// The user picked a path in the front-end; a payment intent opens.
    IntentOpened {
        user_id: UserId,
        reference: Reference,
        choice: PaymentChoice,
        story: Option<String>,
        display_name: String,
    },

    /// An externally confirmed payment arrived at the trust boundary.
    ///
    /// The engine assumes amount/reference/wallet correspond to a real,
    /// settled transfer; it does not re-verify on chain. The amount is the
    /// raw decimal text from the confirmation signal and is validated by
    /// the pipeline.
    PaymentConfirmed {
        reference: Reference,
        user_id: UserId,
        amount: String,
        sender_wallet: String,
    },

    /// A voter cast a vote for a participant.
    VoteCast { voter: UserId, target: UserId },

    /// The front-end reported the generated content length for an entry.
    /// Drives the voting window duration.
    EntryDurationReported { user_id: UserId, seconds: u32 },

    // ═══════════════════════════════════════════════════════════════════════
    // Service Callbacks (priority: Internal)
    // Results of actions the runner performed on the engine's behalf
    // ═══════════════════════════════════════════════════════════════════════
    /// The external market buy finished.
    ///
    /// Callback from [`Action::MarketBuy`]. `None` means the buy failed
    /// after the runner's retries (or returned zero tokens).
    MarketBuyCompleted {
        reference: Reference,
        tokens_received: Option<u64>,
    },

    /// The contributor's token transfer leg finished.
    ///
    /// Callback from [`Action::TransferTokens`] with a user-payout context.
    UserTransferCompleted { reference: Reference, delivered: bool },

    /// The treasury account balance was fetched (cold-start seeding).
    ///
    /// Callback from [`Action::QueryTreasuryBalance`].
    TreasuryBalanceFetched { balance: u64 },

    // ═══════════════════════════════════════════════════════════════════════
    // Internal Events (priority: Internal)
    // ═══════════════════════════════════════════════════════════════════════
    /// A contribution fully settled: purchase and user transfer succeeded.
    /// The lifecycle registers the contributor and credits the pools.
    ContributionSettled { settlement: Settlement },

    /// Winners were announced and round collections were cleared; the
    /// pipeline drops the round's payment intents.
    RoundClosed,
}

impl Event {
    /// Get the priority for this event type.
    pub fn priority(&self) -> EventPriority {
        match self {
            Event::MarketBuyCompleted { .. }
            | Event::UserTransferCompleted { .. }
            | Event::TreasuryBalanceFetched { .. }
            | Event::ContributionSettled { .. }
            | Event::RoundClosed => EventPriority::Internal,


            Event::SubmissionTimer
            | Event::VotingTimer
            | Event::CooldownTimer
            | Event::SweepTimer => EventPriority::Timer,

            Event::IntentOpened { .. }
            | Event::PaymentConfirmed { .. }
            | Event::VoteCast { .. }
            | Event::EntryDurationReported { .. } => EventPriority::Client,
        }
    }

    /// Get the event type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::SubmissionTimer => "SubmissionTimer",
            Event::VotingTimer => "VotingTimer",
            Event::CooldownTimer => "CooldownTimer",
            Event::SweepTimer => "SweepTimer",
            Event::IntentOpened { .. } => "IntentOpened",
            Event::PaymentConfirmed { .. } => "PaymentConfirmed",
            Event::VoteCast { .. } => "VoteCast",
            Event::EntryDurationReported { .. } => "EntryDurationReported",
            Event::MarketBuyCompleted { .. } => "MarketBuyCompleted",
            Event::UserTransferCompleted { .. } => "UserTransferCompleted",
            Event::TreasuryBalanceFetched { .. } => "TreasuryBalanceFetched",
            Event::ContributionSettled { .. } => "ContributionSettled",
            Event::RoundClosed => "RoundClosed",
        }
    }
}
