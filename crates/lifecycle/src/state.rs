//! Round lifecycle state.

use crate::lottery::BonusLottery;
use crate::payout::{prize_payouts, voter_shares, RANK_WEIGHTS};
use storypool_core::{Action, Announcement, Event, Notice, TimerId, TransferContext, WinnerResult};
use storypool_types::{
    EngineConfig, Participant, PaymentChoice, RoundPhase, RoundSnapshot, Settlement, UserId, Voter,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Round lifecycle state machine.
///
/// Single owner of the phase, the participant/voter registries, the
/// per-round pool, and the permanent treasury. All phase timers are
/// single-shot; on restart the node reconstructs them from the persisted
/// absolute deadline rather than replaying full-length phases.
pub struct LifecycleState {
    phase: RoundPhase,
    /// Absolute deadline of the current phase (since unix epoch).
    deadline: Duration,
    /// When the current round's Submission phase opened.
    round_started_at: Duration,

    /// Story entrants in submission order (order breaks vote ties).
    participants: Vec<Participant>,
    /// Paid voters. BTreeMap keeps payout iteration deterministic.
    voters: BTreeMap<UserId, Voter>,

    /// Per-round prize pool. Monotonically increasing during a round,
    /// fully distributed and reset at round end. Never negative.
    round_pool: u64,
    /// Cross-round treasury funding the bonus lottery.
    treasury: u64,
    treasury_seeded: bool,

    lottery: BonusLottery,
    now: Duration,
    config: Arc<EngineConfig>,
}

impl LifecycleState {
    pub fn new(config: Arc<EngineConfig>, lottery: BonusLottery) -> Self {
        LifecycleState {
            phase: RoundPhase::Cooldown,
            deadline: Duration::ZERO,
            round_started_at: Duration::ZERO,
            participants: Vec::new(),
            voters: BTreeMap::new(),
            round_pool: 0,
            treasury: 0,
            treasury_seeded: false,
            lottery,
            now: Duration::ZERO,
            config,
        }
    }

    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    // ── snapshot plumbing ───────────────────────────────────────────────

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round_started_at(&self) -> Duration {
        self.round_started_at
    }

    pub fn round_pool(&self) -> u64 {
        self.round_pool
    }

    pub fn treasury(&self) -> u64 {
        self.treasury
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    /// Write this machine's slice of the snapshot.
    pub fn fill_snapshot(&self, snapshot: &mut RoundSnapshot) {
        snapshot.phase = self.phase;
        snapshot.deadline_ms = self.deadline.as_millis() as u64;
        snapshot.round_started_at_ms = self.round_started_at.as_millis() as u64;
        snapshot.round_pool = self.round_pool;
        snapshot.treasury = self.treasury;
        snapshot.treasury_seeded = self.treasury_seeded;
        snapshot.participants = self.participants.clone();
        snapshot.voters = self.voters.values().cloned().collect();
    }

    /// Restore this machine's slice from a recovered snapshot.
    pub fn restore(&mut self, snapshot: &RoundSnapshot) {
        self.phase = snapshot.phase;
        self.deadline = Duration::from_millis(snapshot.deadline_ms);
        self.round_started_at = Duration::from_millis(snapshot.round_started_at_ms);
        self.round_pool = snapshot.round_pool;
        self.treasury = snapshot.treasury;
        self.treasury_seeded = snapshot.treasury_seeded;
        self.participants = snapshot.participants.clone();
        self.voters = snapshot
            .voters
            .iter()
            .map(|v| (v.user_id, v.clone()))
            .collect();
    }

    /// Compute startup actions: resume the persisted phase or begin a
    /// fresh cycle after a short grace delay.
    ///
    /// If the persisted deadline already passed while the process was
    /// down, the corresponding transition fires immediately; otherwise a
    /// one-shot timer is scheduled for the remaining delta.
    pub fn startup_actions(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.treasury_seeded {
            actions.push(Action::QueryTreasuryBalance);
        }

        if self.deadline.is_zero() && self.round_started_at.is_zero() {
            // No persisted cycle: fresh Submission after the grace delay.
            self.phase = RoundPhase::Cooldown;
            self.deadline = self.now + self.config.startup_grace;
            tracing::info!(
                grace_secs = self.config.startup_grace.as_secs(),
                "no persisted cycle, starting fresh"
            );
            actions.push(Action::SetTimer {
                id: TimerId::Cooldown,
                duration: self.config.startup_grace,
            });
            return actions;
        }

        let (timer_id, event) = match self.phase {
            RoundPhase::Submission => (TimerId::Submission, Event::SubmissionTimer),
            RoundPhase::Voting => (TimerId::Voting, Event::VotingTimer),
            RoundPhase::Cooldown => (TimerId::Cooldown, Event::CooldownTimer),
        };
        let remaining = self.deadline.saturating_sub(self.now);
        if remaining.is_zero() {
            tracing::info!(phase = ?self.phase, "persisted deadline already passed, firing now");
            actions.push(Action::EnqueueInternal { event });
        } else {
            tracing::info!(
                phase = ?self.phase,
                remaining_secs = remaining.as_secs(),
                "resuming persisted phase"
            );
            actions.push(Action::SetTimer {
                id: timer_id,
                duration: remaining,
            });
        }
        actions
    }

    // ── registration & pools ────────────────────────────────────────────

    /// Handle a fully settled contribution: credit the pools and register
    /// the contributor.
    #[instrument(skip(self, s), fields(user_id = %s.user_id, choice = ?s.choice))]
    pub fn on_contribution_settled(&mut self, s: Settlement) -> Vec<Action> {
        // Pool credits are monotonic and unconditional once the user
        // transfer has succeeded.
        self.round_pool += s.round_pool_share;
        self.treasury += s.treasury_share;
        tracing::info!(
            round_pool = self.round_pool,
            treasury = self.treasury,
            "pools credited"
        );

        let mut actions = Vec::new();
        let story_text = s
            .story
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        match (s.choice, story_text) {
            (PaymentChoice::Story, Some(story)) if !self.is_participant(s.user_id) => {
                self.participants.push(Participant {
                    user_id: s.user_id,
                    wallet: s.wallet,
                    display_name: s.display_name,
                    tier_label: s.tier.label.clone(),
                    badge: s.tier.badge.clone(),
                    multiplier: s.tier.multiplier,
                    suno_received: s.user_tokens,
                    amount: s.amount,
                    story,
                    duration_secs: None,
                    votes: 0,
                    voter_ids: BTreeSet::new(),
                });
                actions.push(Action::NotifyUser {
                    user_id: s.user_id,
                    notice: Notice::StoryAccepted {
                        tier_label: s.tier.label,
                        badge: s.tier.badge,
                        tokens: s.user_tokens,
                    },
                });
            }
            (PaymentChoice::Story, _) => {
                // Story choice without usable text, or a duplicate entry:
                // the payment already settled, so degrade to voter.
                tracing::warn!("story settlement degraded to voter");
                self.register_voter(&s);
                actions.push(Action::NotifyUser {
                    user_id: s.user_id,
                    notice: Notice::DegradedToVoter,
                });
            }
            (PaymentChoice::Vote, _) => {
                self.register_voter(&s);
                actions.push(Action::NotifyUser {
                    user_id: s.user_id,
                    notice: Notice::VoteRegistered {
                        tier_label: s.tier.label,
                        badge: s.tier.badge,
                        tokens: s.user_tokens,
                    },
                });
            }
        }

        actions.push(Action::PersistSnapshot);
        actions
    }

    fn register_voter(&mut self, s: &Settlement) {
        self.voters
            .entry(s.user_id)
            .and_modify(|v| {
                // Repeat contribution: amounts accumulate toward the
                // voter-pool share, tier reflects the latest payment.
                v.amount += s.amount;
                v.suno_received += s.user_tokens;
                v.tier_label = s.tier.label.clone();
                v.multiplier = s.tier.multiplier;
            })
            .or_insert_with(|| Voter {
                user_id: s.user_id,
                wallet: s.wallet.clone(),
                display_name: s.display_name.clone(),
                tier_label: s.tier.label.clone(),
                multiplier: s.tier.multiplier,
                suno_received: s.user_tokens,
                amount: s.amount,
                voted_for: None,
            });
    }

    /// Record the content duration hint for an entry.
    pub fn on_entry_duration(&mut self, user_id: UserId, seconds: u32) -> Vec<Action> {
        if let Some(p) = self.participants.iter_mut().find(|p| p.user_id == user_id) {
            p.duration_secs = Some(seconds);
            return vec![Action::PersistSnapshot];
        }
        tracing::debug!(%user_id, "duration hint for unknown entrant, ignoring");
        vec![]
    }

    // ── voting ──────────────────────────────────────────────────────────

    /// Handle a vote. One vote per voter per participant; a voter may
    /// back multiple different participants.
    #[instrument(skip(self), fields(%voter, %target))]
    pub fn on_vote_cast(&mut self, voter: UserId, target: UserId) -> Vec<Action> {
        if self.phase != RoundPhase::Voting {
            return vec![Action::NotifyUser {
                user_id: voter,
                notice: Notice::VoteRejected {
                    reason: "voting is not open".to_string(),
                },
            }];
        }

        let Some(p) = self.participants.iter_mut().find(|p| p.user_id == target) else {
            return vec![Action::NotifyUser {
                user_id: voter,
                notice: Notice::VoteRejected {
                    reason: "entry not found".to_string(),
                },
            }];
        };
        if !p.voter_ids.insert(voter) {
            return vec![Action::NotifyUser {
                user_id: voter,
                notice: Notice::VoteRejected {
                    reason: "you already voted for this entry".to_string(),
                },
            }];
        }
        p.votes += 1;
        tracing::info!(votes = p.votes, "vote recorded");

        if let Some(v) = self.voters.get_mut(&voter) {
            v.voted_for = Some(target);
        }

        vec![
            Action::Announce {
                announcement: Announcement::TallyUpdated {
                    tally: self
                        .participants
                        .iter()
                        .map(|p| (p.user_id, p.votes))
                        .collect(),
                },
            },
            Action::PersistSnapshot,
        ]
    }

    // ── phase transitions ───────────────────────────────────────────────

    /// Submission deadline: enter Voting, or skip straight to Cooldown
    /// when no paid story entrant exists (the pool carries over).
    #[instrument(skip(self))]
    pub fn on_submission_timer(&mut self) -> Vec<Action> {
        if self.phase != RoundPhase::Submission {
            tracing::warn!(phase = ?self.phase, "stale submission timer, ignoring");
            return vec![];
        }

        if self.participants.is_empty() {
            tracing::info!("no paid entrants, skipping voting");
            self.phase = RoundPhase::Cooldown;
            self.deadline = self.now + self.config.cooldown_duration;
            return vec![
                Action::Announce {
                    announcement: Announcement::NoEntries,
                },
                Action::SetTimer {
                    id: TimerId::Cooldown,
                    duration: self.config.cooldown_duration,
                },
                Action::PersistSnapshot,
            ];
        }

        let duration = self.voting_duration();
        self.phase = RoundPhase::Voting;
        self.deadline = self.now + duration;
        tracing::info!(
            entrants = self.participants.len(),
            voting_secs = duration.as_secs(),
            "voting opened"
        );
        vec![
            Action::Announce {
                announcement: Announcement::VotingStarted {
                    entries: self
                        .participants
                        .iter()
                        .map(|p| (p.user_id, p.display_name.clone()))
                        .collect(),
                    ends_in_secs: duration.as_secs(),
                },
            },
            Action::SetTimer {
                id: TimerId::Voting,
                duration,
            },
            Action::PersistSnapshot,
        ]
    }

    /// Voting length: the sum of content durations plus a decision buffer
    /// when every entrant reported a positive hint, else a fixed
    /// per-entrant fallback. Ties the window to how much there is to
    /// review.
    fn voting_duration(&self) -> Duration {
        let hints: Option<u64> = self
            .participants
            .iter()
            .map(|p| match p.duration_secs {
                Some(s) if s > 0 => Some(s as u64),
                _ => None,
            })
            .sum();
        match hints {
            Some(total) => Duration::from_secs(total) + self.config.decision_buffer,
            None => self.config.per_entrant_vote_time * self.participants.len() as u32,
        }
    }

    /// Voting deadline: announce winners, pay out, reset the round.
    ///
    /// The round must always advance: per-winner transfer failures are
    /// the runner's to log, and nothing here blocks the cooldown
    /// transition.
    #[instrument(skip(self))]
    pub fn on_voting_timer(&mut self) -> Vec<Action> {
        if self.phase != RoundPhase::Voting {
            tracing::warn!(phase = ?self.phase, "stale voting timer, ignoring");
            return vec![];
        }

        let mut actions = Vec::new();

        // 1. Rank by votes, submission order breaking ties (stable sort).
        let mut ranked: Vec<usize> = (0..self.participants.len()).collect();
        ranked.sort_by(|&a, &b| self.participants[b].votes.cmp(&self.participants[a].votes));

        // 2. Single bonus draw per round, applied to rank 1 only.
        let bonus = if self.lottery.roll() {
            let amount = self.config.bonus.amount(self.treasury);
            tracing::info!(amount, treasury = self.treasury, "bonus lottery won");
            amount
        } else {
            0
        };

        // 3-4. Ranked payouts from 80% of the pool, weighted and clamped.
        let prize_pool =
            (self.round_pool as f64 * self.config.prize_pool_share).floor() as u64;
        let multipliers: Vec<f64> = ranked
            .iter()
            .take(RANK_WEIGHTS.len())
            .map(|&i| self.participants[i].multiplier)
            .collect();
        let payouts = prize_payouts(prize_pool, &multipliers);

        let mut results = Vec::new();
        for (rank, (&idx, &payout)) in ranked.iter().zip(payouts.iter()).enumerate() {
            let p = &self.participants[idx];
            let rank_bonus = if rank == 0 && bonus > 0 {
                // Deducted from the treasury, never driving it negative:
                // the schedule's percentages are all below one.
                self.treasury -= bonus;
                Some(bonus)
            } else {
                None
            };
            let total = payout + rank_bonus.unwrap_or(0);
            if total > 0 {
                // 5. Per-winner transfer; failures are logged downstream
                // and never abort the remaining payouts.
                actions.push(Action::TransferTokens {
                    wallet: p.wallet.clone(),
                    tokens: total,
                    context: TransferContext::PrizePayout {
                        user_id: p.user_id,
                        rank: rank + 1,
                    },
                });
                actions.push(Action::NotifyUser {
                    user_id: p.user_id,
                    notice: Notice::PrizePaid {
                        rank: rank + 1,
                        tokens: payout,
                        bonus: rank_bonus,
                    },
                });
            }
            results.push(WinnerResult {
                rank: rank + 1,
                user_id: p.user_id,
                display_name: p.display_name.clone(),
                votes: p.votes,
                payout,
                bonus: rank_bonus,
            });
        }

        // 6. Voter pool, pro-rata by contribution among the winner's voters.
        let voter_pool = self.round_pool - prize_pool;
        if let Some(&winner_idx) = ranked.first() {
            let winner_id = self.participants[winner_idx].user_id;
            let eligible: Vec<&Voter> = self
                .voters
                .values()
                .filter(|v| v.voted_for == Some(winner_id))
                .collect();
            let amounts: Vec<f64> = eligible.iter().map(|v| v.amount).collect();
            for (v, share) in eligible.iter().zip(voter_shares(voter_pool, &amounts)) {
                if share == 0 {
                    continue;
                }
                actions.push(Action::TransferTokens {
                    wallet: v.wallet.clone(),
                    tokens: share,
                    context: TransferContext::VoterShare { user_id: v.user_id },
                });
                actions.push(Action::NotifyUser {
                    user_id: v.user_id,
                    notice: Notice::VoterSharePaid { tokens: share },
                });
            }
        }

        tracing::info!(
            winners = results.len(),
            prize_pool,
            voter_pool,
            bonus,
            "round results computed"
        );

        // 7. Announce, reset, advance. The pool is fully distributed.
        actions.push(Action::Announce {
            announcement: Announcement::WinnersAnnounced {
                results,
                voter_pool,
            },
        });
        self.round_pool = 0;
        self.participants.clear();
        self.voters.clear();
        self.phase = RoundPhase::Cooldown;
        self.deadline = self.now + self.config.cooldown_duration;
        actions.push(Action::SetTimer {
            id: TimerId::Cooldown,
            duration: self.config.cooldown_duration,
        });
        actions.push(Action::EnqueueInternal {
            event: Event::RoundClosed,
        });
        actions.push(Action::PersistSnapshot);
        actions
    }

    /// Cooldown deadline: open a fresh Submission phase.
    #[instrument(skip(self))]
    pub fn on_cooldown_timer(&mut self) -> Vec<Action> {
        if self.phase != RoundPhase::Cooldown {
            tracing::warn!(phase = ?self.phase, "stale cooldown timer, ignoring");
            return vec![];
        }
        self.phase = RoundPhase::Submission;
        self.round_started_at = self.now;
        self.deadline = self.now + self.config.submission_duration;
        tracing::info!(
            submission_secs = self.config.submission_duration.as_secs(),
            "new round opened"
        );
        vec![
            Action::Announce {
                announcement: Announcement::SubmissionOpened {
                    ends_in_secs: self.config.submission_duration.as_secs(),
                },
            },
            Action::SetTimer {
                id: TimerId::Submission,
                duration: self.config.submission_duration,
            },
            Action::PersistSnapshot,
        ]
    }

    /// Cold-start treasury seeding from the balance query.
    pub fn on_treasury_fetched(&mut self, balance: u64) -> Vec<Action> {
        if self.treasury_seeded {
            tracing::debug!("treasury already seeded, ignoring balance");
            return vec![];
        }
        self.treasury = balance;
        self.treasury_seeded = true;
        tracing::info!(balance, "treasury seeded");
        vec![Action::PersistSnapshot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storypool_types::{TierParams, WalletAddress};

    const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    fn config() -> Arc<EngineConfig> {
        Arc::new(EngineConfig::default())
    }

    /// A lottery that effectively never wins (huge odds, fixed seed).
    fn cold_lottery() -> BonusLottery {
        BonusLottery::with_seed(u32::MAX, 7)
    }

    /// A lottery that always wins.
    fn hot_lottery() -> BonusLottery {
        BonusLottery::with_seed(1, 7)
    }

    fn lifecycle(lottery: BonusLottery) -> LifecycleState {
        let mut l = LifecycleState::new(config(), lottery);
        l.set_time(Duration::from_secs(10_000));
        l
    }

    fn settlement(user: u64, choice: PaymentChoice, story: Option<&str>, amount: f64) -> Settlement {
        Settlement {
            user_id: UserId(user),
            wallet: WalletAddress::parse(WALLET).unwrap(),
            display_name: format!("user{user}"),
            choice,
            story: story.map(str::to_string),
            amount,
            tier: TierParams {
                retention: 0.5,
                multiplier: 1.0,
                label: "Basic".to_string(),
                badge: "🌱".to_string(),
            },
            user_tokens: 500,
            round_pool_share: 325,
            treasury_share: 175,
        }
    }

    fn enter_submission(l: &mut LifecycleState) {
        l.phase = RoundPhase::Submission;
        l.round_started_at = l.now;
        l.deadline = l.now + l.config.submission_duration;
    }

    fn add_story(l: &mut LifecycleState, user: u64) {
        l.on_contribution_settled(settlement(
            user,
            PaymentChoice::Story,
            Some("once upon a time in the pool"),
            0.02,
        ));
    }

    fn add_voter(l: &mut LifecycleState, user: u64, amount: f64) {
        l.on_contribution_settled(settlement(user, PaymentChoice::Vote, None, amount));
    }

    fn vote(l: &mut LifecycleState, voter: u64, target: u64) -> Vec<Action> {
        l.on_vote_cast(UserId(voter), UserId(target))
    }

    #[test]
    fn settlement_credits_pools_and_registers() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        add_story(&mut l, 1);
        add_voter(&mut l, 2, 0.02);
        assert_eq!(l.round_pool(), 650);
        assert_eq!(l.treasury(), 350);
        assert!(l.is_participant(UserId(1)));
        assert!(l.voters.contains_key(&UserId(2)));
    }

    #[test]
    fn empty_story_degrades_to_voter() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        let actions =
            l.on_contribution_settled(settlement(1, PaymentChoice::Story, Some("   "), 0.02));
        assert!(!l.is_participant(UserId(1)));
        assert!(l.voters.contains_key(&UserId(1)));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::NotifyUser { notice: Notice::DegradedToVoter, .. })));
    }

    #[test]
    fn no_entrants_skips_voting_and_keeps_pool() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        l.round_pool = 777; // carried over from a previous skipped round
        let actions = l.on_submission_timer();
        assert_eq!(l.phase(), RoundPhase::Cooldown);
        assert_eq!(l.round_pool(), 777);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Announce { announcement: Announcement::NoEntries })));
        assert!(actions
            .iter()
            .all(|a| !matches!(a, Action::SetTimer { id: TimerId::Voting, .. })));
    }

    #[test]
    fn voting_window_uses_duration_hints_when_all_present() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        add_story(&mut l, 1);
        add_story(&mut l, 2);
        l.on_entry_duration(UserId(1), 30);
        l.on_entry_duration(UserId(2), 45);
        let actions = l.on_submission_timer();
        let Some(Action::SetTimer { duration, .. }) = actions
            .iter()
            .find(|a| matches!(a, Action::SetTimer { id: TimerId::Voting, .. }))
        else {
            panic!("voting timer not set");
        };
        // 30 + 45 + 60s decision buffer, not the 2x120s fallback.
        assert_eq!(*duration, Duration::from_secs(135));
    }

    #[test]
    fn voting_window_falls_back_per_entrant() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        add_story(&mut l, 1);
        add_story(&mut l, 2);
        l.on_entry_duration(UserId(1), 30); // second entrant has no hint
        let actions = l.on_submission_timer();
        let Some(Action::SetTimer { duration, .. }) = actions
            .iter()
            .find(|a| matches!(a, Action::SetTimer { id: TimerId::Voting, .. }))
        else {
            panic!("voting timer not set");
        };
        assert_eq!(*duration, Duration::from_secs(240));
    }

    #[test]
    fn duplicate_vote_is_rejected() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        add_story(&mut l, 1);
        add_voter(&mut l, 2, 0.02);
        l.on_submission_timer();
        assert_eq!(l.phase(), RoundPhase::Voting);

        assert!(vote(&mut l, 2, 1)
            .iter()
            .any(|a| matches!(a, Action::PersistSnapshot)));
        let second = vote(&mut l, 2, 1);
        assert!(second
            .iter()
            .any(|a| matches!(a, Action::NotifyUser { notice: Notice::VoteRejected { .. }, .. })));
        assert_eq!(l.participants[0].votes, 1);
        assert_eq!(l.participants[0].voter_ids.len(), 1);
    }

    #[test]
    fn vote_for_unknown_entry_is_rejected() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        add_story(&mut l, 1);
        l.on_submission_timer();
        let actions = vote(&mut l, 2, 99);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::NotifyUser { notice: Notice::VoteRejected { .. }, .. })));
    }

    #[test]
    fn winner_announcement_distributes_and_resets() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        add_story(&mut l, 1);
        add_story(&mut l, 2);
        add_voter(&mut l, 3, 0.02);
        let pool_before = l.round_pool();
        assert_eq!(pool_before, 3 * 325);
        l.on_submission_timer();
        vote(&mut l, 3, 2); // user 2 wins
        let treasury_before = l.treasury();

        let actions = l.on_voting_timer();

        // Prize pool is 80% of the round pool; payouts stay within it.
        let prize_pool = (pool_before as f64 * 0.80).floor() as u64;
        let paid: u64 = actions
            .iter()
            .filter_map(|a| match a {
                Action::TransferTokens {
                    tokens,
                    context: TransferContext::PrizePayout { .. },
                    ..
                } => Some(*tokens),
                _ => None,
            })
            .sum();
        assert!(paid <= prize_pool);

        // Rank 1 is user 2 (one vote beats zero).
        let Some(Action::Announce {
            announcement: Announcement::WinnersAnnounced { results, voter_pool },
        }) = actions
            .iter()
            .find(|a| matches!(a, Action::Announce { announcement: Announcement::WinnersAnnounced { .. } }))
        else {
            panic!("no results announcement");
        };
        assert_eq!(results[0].user_id, UserId(2));
        assert_eq!(*voter_pool, pool_before - prize_pool);

        // Voter 3 backed the winner and gets the whole voter pool.
        let shares: Vec<u64> = actions
            .iter()
            .filter_map(|a| match a {
                Action::TransferTokens {
                    tokens,
                    context: TransferContext::VoterShare { .. },
                    ..
                } => Some(*tokens),
                _ => None,
            })
            .collect();
        assert_eq!(shares, vec![*voter_pool]);

        // Reset: pool zero, collections cleared, cooldown scheduled.
        assert_eq!(l.round_pool(), 0);
        assert!(l.participants.is_empty());
        assert!(l.voters.is_empty());
        assert_eq!(l.phase(), RoundPhase::Cooldown);
        assert_eq!(l.treasury(), treasury_before); // no bonus drawn
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::EnqueueInternal { event: Event::RoundClosed })));
    }

    #[test]
    fn ties_break_by_submission_order() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        add_story(&mut l, 1);
        add_story(&mut l, 2);
        l.on_submission_timer();
        let actions = l.on_voting_timer();
        let Some(Action::Announce {
            announcement: Announcement::WinnersAnnounced { results, .. },
        }) = actions
            .iter()
            .find(|a| matches!(a, Action::Announce { announcement: Announcement::WinnersAnnounced { .. } }))
        else {
            panic!("no results announcement");
        };
        assert_eq!(results[0].user_id, UserId(1));
        assert_eq!(results[1].user_id, UserId(2));
    }

    #[test]
    fn bonus_goes_to_rank_one_and_drains_treasury() {
        let mut l = lifecycle(hot_lottery());
        enter_submission(&mut l);
        add_story(&mut l, 1);
        add_story(&mut l, 2);
        let treasury_before = l.treasury();
        assert!(treasury_before > 0);
        let expected_bonus = l.config.bonus.amount(treasury_before);
        l.on_submission_timer();

        let actions = l.on_voting_timer();
        let Some(Action::Announce {
            announcement: Announcement::WinnersAnnounced { results, .. },
        }) = actions
            .iter()
            .find(|a| matches!(a, Action::Announce { announcement: Announcement::WinnersAnnounced { .. } }))
        else {
            panic!("no results announcement");
        };
        assert_eq!(results[0].bonus, Some(expected_bonus));
        assert!(results[1..].iter().all(|r| r.bonus.is_none()));
        assert_eq!(l.treasury(), treasury_before - expected_bonus);
    }

    #[test]
    fn treasury_seeding_is_once_only() {
        let mut l = lifecycle(cold_lottery());
        l.on_treasury_fetched(1234);
        assert_eq!(l.treasury(), 1234);
        l.on_treasury_fetched(9999);
        assert_eq!(l.treasury(), 1234);
    }

    #[test]
    fn cold_startup_schedules_grace_cooldown_and_treasury_query() {
        let mut l = lifecycle(cold_lottery());
        let actions = l.startup_actions();
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::QueryTreasuryBalance)));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::SetTimer { id: TimerId::Cooldown, .. }
        )));
        assert_eq!(l.phase(), RoundPhase::Cooldown);
    }

    #[test]
    fn restart_with_live_deadline_resumes_remaining_delta() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        let mut snapshot = empty_snapshot();
        l.fill_snapshot(&mut snapshot);

        // Restart 100 seconds later.
        let mut restarted = LifecycleState::new(config(), cold_lottery());
        restarted.restore(&snapshot);
        restarted.set_time(Duration::from_secs(10_100));
        restarted.treasury_seeded = true;
        let actions = restarted.startup_actions();
        let Some(Action::SetTimer { id, duration }) = actions.first() else {
            panic!("expected a resumed timer");
        };
        assert_eq!(*id, TimerId::Submission);
        assert_eq!(*duration, Duration::from_secs(300 - 100));
    }

    #[test]
    fn restart_with_expired_deadline_fires_immediately() {
        let mut l = lifecycle(cold_lottery());
        enter_submission(&mut l);
        let mut snapshot = empty_snapshot();
        l.fill_snapshot(&mut snapshot);

        let mut restarted = LifecycleState::new(config(), cold_lottery());
        restarted.restore(&snapshot);
        restarted.set_time(Duration::from_secs(20_000));
        restarted.treasury_seeded = true;
        let actions = restarted.startup_actions();
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::EnqueueInternal { event: Event::SubmissionTimer }
        )));
    }

    fn empty_snapshot() -> RoundSnapshot {
        RoundSnapshot {
            phase: RoundPhase::Cooldown,
            deadline_ms: 0,
            round_started_at_ms: 0,
            round_pool: 0,
            treasury: 0,
            treasury_seeded: false,
            participants: vec![],
            voters: vec![],
            intents: vec![],
        }
    }
}
