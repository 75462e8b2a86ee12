//! Engine state machine.

use storypool_core::{Action, Event, StateMachine, TimerId};
use storypool_lifecycle::{BonusLottery, LifecycleState};
use storypool_pipeline::PipelineState;
use storypool_types::{EngineConfig, RoundPhase, RoundSnapshot, UserId};
use std::sync::Arc;
use std::time::Duration;

/// Combined engine state machine.
///
/// Composes the payment pipeline and the round lifecycle into one
/// deterministic machine. All events flow through [`StateMachine::handle`],
/// which the runner calls from a single task, so neither sub-machine needs
/// interior locking.
pub struct NodeStateMachine {
    pipeline: PipelineState,
    lifecycle: LifecycleState,
    now: Duration,
}

impl std::fmt::Debug for NodeStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStateMachine")
            .field("phase", &self.lifecycle.phase())
            .field("round_pool", &self.lifecycle.round_pool())
            .field("now", &self.now)
            .finish()
    }
}

impl NodeStateMachine {
    /// Create the engine from config and an optional recovered snapshot.
    ///
    /// `None` means a fresh start; `Some` resumes the persisted round,
    /// including unconfirmed payment intents.
    pub fn new(
        config: Arc<EngineConfig>,
        recovered: Option<RoundSnapshot>,
        lottery: BonusLottery,
    ) -> Self {
        let mut pipeline = PipelineState::new(config.clone());
        let mut lifecycle = LifecycleState::new(config, lottery);
        if let Some(snapshot) = recovered {
            lifecycle.restore(&snapshot);
            pipeline.restore(snapshot.intents);
        }
        NodeStateMachine {
            pipeline,
            lifecycle,
            now: Duration::ZERO,
        }
    }

    /// Actions to run once at startup, after `set_time`: resume or begin
    /// the phase cycle and arm the intent sweeper.
    pub fn startup_actions(&mut self) -> Vec<Action> {
        let mut actions = self.lifecycle.startup_actions();
        actions.push(Action::SetTimer {
            id: TimerId::Sweep,
            duration: self.sweep_interval(),
        });
        actions
    }

    fn sweep_interval(&self) -> Duration {
        // Both sub-machines share one config Arc; the pipeline owns the
        // sweeper so it exposes the interval.
        self.pipeline.sweep_interval()
    }

    /// Assemble the persistable snapshot of the whole engine.
    pub fn snapshot(&self) -> RoundSnapshot {
        let mut snapshot = RoundSnapshot {
            phase: RoundPhase::Cooldown,
            deadline_ms: 0,
            round_started_at_ms: 0,
            round_pool: 0,
            treasury: 0,
            treasury_seeded: false,
            participants: vec![],
            voters: vec![],
            intents: self.pipeline.intents(),
        };
        self.lifecycle.fill_snapshot(&mut snapshot);
        snapshot
    }

    pub fn phase(&self) -> RoundPhase {
        self.lifecycle.phase()
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.lifecycle.is_participant(user_id)
    }
}

impl StateMachine for NodeStateMachine {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        tracing::trace!(event = event.type_name(), "handling event");
        match event {
            // Phase timers
            Event::SubmissionTimer => self.lifecycle.on_submission_timer(),
            Event::VotingTimer => self.lifecycle.on_voting_timer(),
            Event::CooldownTimer => self.lifecycle.on_cooldown_timer(),
            Event::SweepTimer => self
                .pipeline
                .on_sweep_timer(self.lifecycle.round_started_at()),

            // Client inputs
            Event::IntentOpened {
                user_id,
                reference,
                choice,
                story,
                display_name,
            } => {
                let already = self.lifecycle.is_participant(user_id);
                self.pipeline
                    .on_intent_opened(user_id, reference, choice, story, display_name, already)
            }
            Event::PaymentConfirmed {
                reference,
                user_id,
                amount,
                sender_wallet,
            } => self
                .pipeline
                .on_payment_confirmed(reference, user_id, &amount, &sender_wallet),
            Event::VoteCast { voter, target } => self.lifecycle.on_vote_cast(voter, target),
            Event::EntryDurationReported { user_id, seconds } => {
                self.lifecycle.on_entry_duration(user_id, seconds)
            }

            // Service callbacks
            Event::MarketBuyCompleted {
                reference,
                tokens_received,
            } => self
                .pipeline
                .on_market_buy_completed(reference, tokens_received),
            Event::UserTransferCompleted {
                reference,
                delivered,
            } => self
                .pipeline
                .on_user_transfer_completed(reference, delivered),
            Event::TreasuryBalanceFetched { balance } => {
                self.lifecycle.on_treasury_fetched(balance)
            }

            // Internal cross-machine events
            Event::ContributionSettled { settlement } => {
                self.lifecycle.on_contribution_settled(settlement)
            }
            Event::RoundClosed => {
                self.pipeline.on_round_closed();
                vec![]
            }
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
        self.pipeline.set_time(now);
        self.lifecycle.set_time(now);
    }
}
