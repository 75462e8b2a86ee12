//! Simulation runner.
//!
//! Processes events in deterministic order and executes actions inline.
//! External services are scripted: buy and transfer outcomes come from
//! queues the test fills in, snapshots persist to an in-memory slot, and
//! all notices and announcements are captured for assertion.

use storypool_core::{
    Action, Announcement, Event, EventPriority, Notice, StateMachine, TimerId, TransferContext,
};
use storypool_lifecycle::BonusLottery;
use storypool_node::NodeStateMachine;
use storypool_types::{EngineConfig, RoundPhase, RoundSnapshot, UserId, WalletAddress};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Deterministic ordering key for queued events.
///
/// Events at the same virtual time are processed in priority order
/// (internal before timer before client), then insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    time: Duration,
    priority: EventPriority,
    seq: u64,
}

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone)]
pub struct SimStats {
    pub events_processed: u64,
    pub actions_generated: u64,
    pub timers_set: u64,
    pub timers_cancelled: u64,
    pub snapshot_writes: u64,
}

/// Deterministic single-node simulation runner.
pub struct SimRunner {
    node: NodeStateMachine,
    config: Arc<EngineConfig>,
    seed: u64,

    /// Global event queue, ordered deterministically.
    queue: BTreeMap<EventKey, Event>,
    sequence: u64,
    now: Duration,

    /// Timer registry for cancellation support (id -> queued key).
    timers: HashMap<TimerId, EventKey>,

    /// Scripted market buy outcomes, consumed front to back; when the
    /// script runs out, `default_buy` applies.
    buy_outcomes: VecDeque<Option<u64>>,
    default_buy: Option<u64>,
    /// Scripted user-payout transfer outcomes; default is success.
    transfer_outcomes: VecDeque<bool>,
    /// Balance returned by the treasury query.
    treasury_balance: u64,

    /// Captured outputs.
    pub notices: Vec<(UserId, Notice)>,
    pub announcements: Vec<Announcement>,
    pub fee_payments: Vec<f64>,
    pub transfers: Vec<(WalletAddress, u64, TransferContext)>,

    /// The in-memory "disk": last persisted snapshot, if any.
    saved_snapshot: Option<RoundSnapshot>,

    pub stats: SimStats,
}

impl SimRunner {
    /// Create a fresh simulation. Virtual time starts at a nonzero epoch
    /// offset so absolute deadlines are distinguishable from unset ones.
    pub fn new(config: Arc<EngineConfig>, seed: u64) -> Self {
        let mut sim = SimRunner {
            node: NodeStateMachine::new(
                config.clone(),
                None,
                BonusLottery::with_seed(config.bonus_odds, seed),
            ),
            config,
            seed,
            queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::from_secs(1_000_000),
            timers: HashMap::new(),
            buy_outcomes: VecDeque::new(),
            default_buy: Some(1000),
            transfer_outcomes: VecDeque::new(),
            treasury_balance: 0,
            notices: Vec::new(),
            announcements: Vec::new(),
            fee_payments: Vec::new(),
            transfers: Vec::new(),
            saved_snapshot: None,
            stats: SimStats::default(),
        };
        sim.boot();
        sim
    }

    fn boot(&mut self) {
        self.node.set_time(self.now);
        let actions = self.node.startup_actions();
        self.process_actions(actions);
    }

    /// Simulate a process crash and restart at the current virtual time.
    ///
    /// The node is rebuilt from the last persisted snapshot; live timers
    /// and queued callback events are lost, exactly as in a real crash.
    pub fn restart(&mut self) {
        self.restart_after(Duration::ZERO);
    }

    /// Crash, stay down for `downtime`, then restart. Nothing queued
    /// survives the crash and nothing happens while down.
    pub fn restart_after(&mut self, downtime: Duration) {
        self.queue.clear();
        self.timers.clear();
        self.now += downtime;
        self.node = NodeStateMachine::new(
            self.config.clone(),
            self.saved_snapshot.clone(),
            BonusLottery::with_seed(self.config.bonus_odds, self.seed),
        );
        self.boot();
    }

    // ── scripting ───────────────────────────────────────────────────────

    /// Queue the outcome of the next market buy (`None` = failure).
    pub fn script_buy(&mut self, outcome: Option<u64>) {
        self.buy_outcomes.push_back(outcome);
    }

    /// Set the outcome applied when the buy script is empty.
    pub fn set_default_buy(&mut self, outcome: Option<u64>) {
        self.default_buy = outcome;
    }

    /// Queue the outcome of the next user-payout transfer.
    pub fn script_transfer(&mut self, delivered: bool) {
        self.transfer_outcomes.push_back(delivered);
    }

    pub fn set_treasury_balance(&mut self, balance: u64) {
        self.treasury_balance = balance;
    }

    // ── inputs ──────────────────────────────────────────────────────────

    /// Submit an external event at the current virtual time.
    pub fn submit(&mut self, event: Event) {
        self.enqueue(self.now, event);
    }

    // ── time ────────────────────────────────────────────────────────────

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn phase(&self) -> RoundPhase {
        self.node.phase()
    }

    /// The engine's current full state (not the persisted copy).
    pub fn snapshot(&self) -> RoundSnapshot {
        self.node.snapshot()
    }

    /// The last persisted snapshot, as a restart would see it.
    pub fn saved_snapshot(&self) -> Option<&RoundSnapshot> {
        self.saved_snapshot.as_ref()
    }

    /// Process a single queued event, advancing virtual time to it.
    /// Returns false when the queue is empty.
    pub fn step(&mut self) -> bool {
        let Some((&key, _)) = self.queue.iter().next() else {
            return false;
        };
        let Some(event) = self.queue.remove(&key) else {
            return false;
        };
        self.now = key.time.max(self.now);
        self.timers.retain(|_, k| *k != key);

        trace!(event = event.type_name(), now_secs = self.now.as_secs(), "sim step");
        self.node.set_time(self.now);
        let actions = self.node.handle(event);
        self.stats.events_processed += 1;
        self.process_actions(actions);
        true
    }

    /// Advance virtual time by `duration`, processing everything due.
    pub fn advance(&mut self, duration: Duration) {
        let target = self.now + duration;
        loop {
            let due = match self.queue.keys().next() {
                Some(key) if key.time <= target => true,
                _ => false,
            };
            if !due {
                break;
            }
            self.step();
        }
        self.now = target;
        self.node.set_time(self.now);
    }

    /// Drain every event due at the current instant (service callbacks,
    /// internal follow-ups) without moving time forward.
    pub fn settle(&mut self) {
        self.advance(Duration::ZERO);
    }

    // ── action execution ────────────────────────────────────────────────

    fn enqueue(&mut self, time: Duration, event: Event) -> EventKey {
        self.sequence += 1;
        let key = EventKey {
            time,
            priority: event.priority(),
            seq: self.sequence,
        };
        self.queue.insert(key, event);
        key
    }

    fn process_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.stats.actions_generated += 1;
            self.process_action(action);
        }
    }

    fn process_action(&mut self, action: Action) {
        match action {
            Action::SetTimer { id, duration } => {
                if let Some(old) = self.timers.remove(&id) {
                    self.queue.remove(&old);
                    self.stats.timers_cancelled += 1;
                }
                let event = match id {
                    TimerId::Submission => Event::SubmissionTimer,
                    TimerId::Voting => Event::VotingTimer,
                    TimerId::Cooldown => Event::CooldownTimer,
                    TimerId::Sweep => Event::SweepTimer,
                };
                let key = self.enqueue(self.now + duration, event);
                self.timers.insert(id, key);
                self.stats.timers_set += 1;
            }

            Action::CancelTimer { id } => {
                if let Some(key) = self.timers.remove(&id) {
                    self.queue.remove(&key);
                    self.stats.timers_cancelled += 1;
                }
            }

            Action::EnqueueInternal { event } => {
                self.enqueue(self.now, event);
            }

            Action::MarketBuy { reference, .. } => {
                let tokens_received = self
                    .buy_outcomes
                    .pop_front()
                    .unwrap_or(self.default_buy);
                self.enqueue(
                    self.now,
                    Event::MarketBuyCompleted {
                        reference,
                        tokens_received,
                    },
                );
            }

            Action::SendFee { amount } => {
                self.fee_payments.push(amount);
            }

            Action::TransferTokens {
                wallet,
                tokens,
                context,
            } => {
                self.transfers.push((wallet, tokens, context.clone()));
                if let TransferContext::UserPayout { reference, .. } = context {
                    let delivered = self.transfer_outcomes.pop_front().unwrap_or(true);
                    self.enqueue(
                        self.now,
                        Event::UserTransferCompleted {
                            reference,
                            delivered,
                        },
                    );
                }
            }

            Action::QueryTreasuryBalance => {
                let balance = self.treasury_balance;
                self.enqueue(self.now, Event::TreasuryBalanceFetched { balance });
            }

            Action::NotifyUser { user_id, notice } => {
                self.notices.push((user_id, notice));
            }

            Action::Announce { announcement } => {
                self.announcements.push(announcement);
            }

            Action::PersistSnapshot => {
                self.saved_snapshot = Some(self.node.snapshot());
                self.stats.snapshot_writes += 1;
            }
        }
    }
}
