//! Outbound message types for user notices and channel announcements.
//!
//! These are typed payloads, not rendered text: the chat front-end owns
//! presentation. The runner hands them to the notification sink, which is
//! fire-and-forget (delivery failures are logged, never fatal).

use storypool_types::UserId;

/// A direct notice to a single user.
#[derive(Debug, Clone)]
pub enum Notice {
    /// A payment confirmation failed validation. No state was mutated.
    PaymentRejected { reason: String },
    /// A story intent could not be opened (duplicate entry or story text
    /// outside the length bounds).
    EntryRejected { reason: String },
    /// The market buy failed after retries; the contribution was not
    /// registered and the intent stays unpaid.
    PurchaseFailed,
    /// The token payout transfer failed; the contribution was not
    /// registered.
    TransferFailed,
    /// Story entry registered.
    StoryAccepted {
        tier_label: String,
        badge: String,
        tokens: u64,
    },
    /// Voter registered.
    VoteRegistered {
        tier_label: String,
        badge: String,
        tokens: u64,
    },
    /// A story-choice payment arrived without usable story text, or the
    /// user was already an entrant; they were registered as a voter.
    DegradedToVoter,
    /// A vote was not counted.
    VoteRejected { reason: String },
    /// The unconfirmed payment intent timed out and was removed.
    IntentExpired,
    /// A ranked prize was paid.
    PrizePaid {
        rank: usize,
        tokens: u64,
        bonus: Option<u64>,
    },
    /// A voter-pool share was paid.
    VoterSharePaid { tokens: u64 },
}

/// A single winner line in the results announcement.
#[derive(Debug, Clone)]
pub struct WinnerResult {
    pub rank: usize,
    pub user_id: UserId,
    pub display_name: String,
    pub votes: u32,
    pub payout: u64,
    pub bonus: Option<u64>,
}

/// A public channel announcement.
#[derive(Debug, Clone)]
pub enum Announcement {
    /// A new round's Submission phase opened.
    SubmissionOpened { ends_in_secs: u64 },
    /// Voting started over the listed entries.
    VotingStarted {
        entries: Vec<(UserId, String)>,
        ends_in_secs: u64,
    },
    /// The submission window closed with no paid entrants; the round pool
    /// carries over.
    NoEntries,
    /// The public vote tally changed.
    TallyUpdated { tally: Vec<(UserId, u32)> },
    /// Round results: ranked winners and the voter-pool size.
    WinnersAnnounced {
        results: Vec<WinnerResult>,
        voter_pool: u64,
    },
}
