//! Round state records.

use crate::{Reference, TierParams, UserId, WalletAddress};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The round lifecycle phase. Exactly one is active at a time.
///
/// Legal transitions are Submission→Voting→Cooldown→Submission, plus
/// Submission→Cooldown when voting is skipped because no paid story
/// entrant exists. No other edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    Submission,
    Voting,
    Cooldown,
}

/// What the user chose to pay for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentChoice {
    /// Submit a story and compete for the prize pool.
    Story,
    /// Vote on other entries and share the voter pool.
    Vote,
}

/// A declared intent to pay, awaiting external confirmation.
///
/// Created when the user picks a path in the front-end; `confirmed` is set
/// on the first matching external payment signal and `paid` once the full
/// settlement pipeline completes. Unconfirmed intents expire after a
/// timeout (see the expiry sweeper).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub user_id: UserId,
    pub reference: Reference,
    pub choice: PaymentChoice,
    /// Milliseconds since the unix epoch. Zero means unknown; the sweeper
    /// then falls back to the round start time.
    pub created_at_ms: u64,
    pub confirmed: bool,
    pub paid: bool,
    pub story: Option<String>,
    pub display_name: String,
}

/// A paid story entrant for the current round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub wallet: WalletAddress,
    pub display_name: String,
    pub tier_label: String,
    pub badge: String,
    pub multiplier: f64,
    /// Tokens delivered to the entrant at payment time.
    pub suno_received: u64,
    /// Original contribution amount.
    pub amount: f64,
    pub story: String,
    /// Content duration hint in seconds, reported by the front-end once
    /// the entry's media is generated. Drives the voting window length.
    pub duration_secs: Option<u32>,
    pub votes: u32,
    /// One vote per voter per participant; a BTreeSet keeps iteration
    /// deterministic for snapshots and tests.
    pub voter_ids: BTreeSet<UserId>,
}

/// A paid voter for the current round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    pub user_id: UserId,
    pub wallet: WalletAddress,
    pub display_name: String,
    pub tier_label: String,
    pub multiplier: f64,
    pub suno_received: u64,
    /// Original contribution amount; weights the voter-pool share.
    pub amount: f64,
    /// Participant this voter backed, if they have voted.
    pub voted_for: Option<UserId>,
}

/// A fully settled contribution, handed from the payment pipeline to the
/// round lifecycle for registration and pool accounting.
///
/// By the time this exists, the market purchase and the contributor's
/// token transfer have both succeeded.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub user_id: UserId,
    pub wallet: WalletAddress,
    pub display_name: String,
    pub choice: PaymentChoice,
    pub story: Option<String>,
    pub amount: f64,
    pub tier: TierParams,
    /// Tokens transferred to the contributor.
    pub user_tokens: u64,
    /// Tokens credited to the per-round prize pool.
    pub round_pool_share: u64,
    /// Tokens credited to the permanent treasury.
    pub treasury_share: u64,
}
