//! Tokio runner for the engine state machine.
//!
//! Uses the event aggregator pattern: a single task owns the state machine
//! and receives events via mpsc channels, so all mutations are serialized
//! without locks. Slow external calls run in spawned tasks and return as
//! callback events on a dedicated channel.

use crate::retry::{retry_with_backoff, RetryConfig};
use crate::services::{MarketService, NotificationSink, TokenService, TreasuryService};
use crate::snapshot::{SnapshotError, SnapshotStore};
use crate::timers::TimerManager;
use storypool_core::{Action, Event, StateMachine, TransferContext};
use storypool_lifecycle::BonusLottery;
use storypool_node::NodeStateMachine;
use storypool_types::{EngineConfig, PaymentChoice, Reference, UserId, WalletAddress};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, span, Level};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Event channel closed")]
    ChannelClosed,
    #[error("Snapshot store error: {0}")]
    Storage(#[from] SnapshotError),
    #[error("Fee destination wallet is not configured")]
    MissingFeeWallet,
}

/// Handle for shutting down a running EngineRunner.
///
/// When dropped, signals the runner to exit gracefully.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl ShutdownHandle {
    /// Trigger shutdown (consumes the handle).
    pub fn shutdown(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ShutdownHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Client handle for feeding external inputs into the engine.
///
/// This is the surface the chat front-end and the payment endpoint call.
#[derive(Debug, Clone)]
pub struct RunnerHandle {
    client_tx: mpsc::Sender<Event>,
}

impl RunnerHandle {
    /// The user picked a path in the front-end; open a payment intent.
    pub async fn open_intent(
        &self,
        user_id: UserId,
        reference: Reference,
        choice: PaymentChoice,
        story: Option<String>,
        display_name: String,
    ) -> Result<(), RunnerError> {
        self.send(Event::IntentOpened {
            user_id,
            reference,
            choice,
            story,
            display_name,
        })
        .await
    }

    /// An externally confirmed payment arrived.
    pub async fn confirm_payment(
        &self,
        reference: Reference,
        user_id: UserId,
        amount: String,
        sender_wallet: String,
    ) -> Result<(), RunnerError> {
        self.send(Event::PaymentConfirmed {
            reference,
            user_id,
            amount,
            sender_wallet,
        })
        .await
    }

    pub async fn cast_vote(&self, voter: UserId, target: UserId) -> Result<(), RunnerError> {
        self.send(Event::VoteCast { voter, target }).await
    }

    pub async fn report_entry_duration(
        &self,
        user_id: UserId,
        seconds: u32,
    ) -> Result<(), RunnerError> {
        self.send(Event::EntryDurationReported { user_id, seconds })
            .await
    }

    async fn send(&self, event: Event) -> Result<(), RunnerError> {
        self.client_tx
            .send(event)
            .await
            .map_err(|_| RunnerError::ChannelClosed)
    }
}

/// Production runner with async I/O.
///
/// Construct with [`EngineRunner::new`], take the [`RunnerHandle`] and
/// [`ShutdownHandle`], then spawn [`EngineRunner::run`].
pub struct EngineRunner {
    /// The state machine (owned, not shared).
    state: NodeStateMachine,

    /// Receives timer events. Dedicated small channel so phase deadlines
    /// are never blocked behind a flood of client inputs.
    timer_rx: mpsc::Receiver<Event>,
    /// Receives service callback events (buy/transfer results). Unbounded
    /// so spawned service tasks never block sending their result.
    callback_rx: mpsc::UnboundedReceiver<Event>,
    callback_tx: mpsc::UnboundedSender<Event>,
    /// Receives client inputs (front-end, payment endpoint).
    client_rx: mpsc::Receiver<Event>,
    client_tx: mpsc::Sender<Event>,

    /// Internal events produced by the current batch, drained before the
    /// next channel receive so causality is preserved.
    internal: VecDeque<Event>,

    timer_manager: TimerManager,
    market: Arc<dyn MarketService>,
    tokens: Arc<dyn TokenService>,
    treasury: Arc<dyn TreasuryService>,
    notifications: Arc<dyn NotificationSink>,
    store: Arc<dyn SnapshotStore>,
    buy_retry: RetryConfig,
    fee_wallet: WalletAddress,

    shutdown_rx: oneshot::Receiver<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}

impl EngineRunner {
    /// Build the runner, recovering persisted state from the store.
    pub fn new(
        config: Arc<EngineConfig>,
        store: Arc<dyn SnapshotStore>,
        market: Arc<dyn MarketService>,
        tokens: Arc<dyn TokenService>,
        treasury: Arc<dyn TreasuryService>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Result<Self, RunnerError> {
        let fee_wallet = config
            .fee_wallet
            .clone()
            .ok_or(RunnerError::MissingFeeWallet)?;
        let recovered = store.load()?;
        if recovered.is_some() {
            info!("recovered persisted snapshot");
        }
        let lottery = BonusLottery::new(config.bonus_odds);
        let state = NodeStateMachine::new(config.clone(), recovered, lottery);

        let (timer_tx, timer_rx) = mpsc::channel(16);
        let (callback_tx, callback_rx) = mpsc::unbounded_channel();
        let (client_tx, client_rx) = mpsc::channel(1024);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        Ok(Self {
            state,
            timer_rx,
            callback_rx,
            callback_tx,
            client_rx,
            client_tx,
            internal: VecDeque::new(),
            timer_manager: TimerManager::new(timer_tx),
            market,
            tokens,
            treasury,
            notifications,
            store,
            buy_retry: RetryConfig {
                max_attempts: config.buy_max_retries,
                backoff_base: config.buy_backoff_base,
                call_timeout: config.call_timeout,
            },
            fee_wallet,
            shutdown_rx,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Get a client handle for submitting external inputs.
    pub fn handle(&self) -> RunnerHandle {
        RunnerHandle {
            client_tx: self.client_tx.clone(),
        }
    }

    /// Take the shutdown handle. Can only be called once.
    pub fn shutdown_handle(&mut self) -> Option<ShutdownHandle> {
        self.shutdown_tx
            .take()
            .map(|tx| ShutdownHandle { tx: Some(tx) })
    }

    /// Run the main event loop until shutdown. Spawn this as a task.
    pub async fn run(mut self) -> Result<(), RunnerError> {
        info!(phase = ?self.state.phase(), "starting engine runner");

        self.state.set_time(unix_now());
        let startup = self.state.startup_actions();
        self.dispatch_actions(startup).await;
        self.drain_internal().await;

        loop {
            // Biased select for priority ordering: shutdown, then timers
            // (phase liveness), then service callbacks (in-flight
            // settlements), then client inputs.
            tokio::select! {
                biased;

                _ = &mut self.shutdown_rx => {
                    info!("shutdown signal received");
                    break;
                }

                Some(event) = self.timer_rx.recv() => {
                    self.process(event).await;
                }

                Some(event) = self.callback_rx.recv() => {
                    self.process(event).await;
                }

                event = self.client_rx.recv() => {
                    match event {
                        Some(event) => self.process(event).await,
                        None => break,
                    }
                }
            }
        }

        self.timer_manager.cancel_all();
        Ok(())
    }

    async fn process(&mut self, event: Event) {
        let event_span = span!(Level::DEBUG, "handle_event", event.r#type = event.type_name());
        let _guard = event_span.enter();

        self.state.set_time(unix_now());
        let actions = self.state.handle(event);
        self.dispatch_actions(actions).await;
        self.drain_internal().await;
    }

    /// Process internal events produced by the current batch before
    /// receiving anything new.
    async fn drain_internal(&mut self) {
        while let Some(event) = self.internal.pop_front() {
            let actions = self.state.handle(event);
            self.dispatch_actions(actions).await;
        }
    }

    async fn dispatch_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.process_action(action).await;
        }
    }

    async fn process_action(&mut self, action: Action) {
        match action {
            Action::SetTimer { id, duration } => {
                self.timer_manager.set_timer(id, duration);
            }

            Action::CancelTimer { id } => {
                self.timer_manager.cancel_timer(id);
            }

            Action::EnqueueInternal { event } => {
                self.internal.push_back(event);
            }

            Action::MarketBuy { reference, amount } => {
                let market = self.market.clone();
                let callback_tx = self.callback_tx.clone();
                let retry = self.buy_retry.clone();
                tokio::spawn(async move {
                    let result =
                        retry_with_backoff(&retry, "market buy", || market.buy(amount)).await;
                    let tokens_received = match result {
                        Ok(tokens) => Some(tokens),
                        Err(e) => {
                            error!(%reference, error = %e, "market buy failed");
                            None
                        }
                    };
                    let _ = callback_tx.send(Event::MarketBuyCompleted {
                        reference,
                        tokens_received,
                    });
                });
            }

            Action::SendFee { amount } => {
                let tokens = self.tokens.clone();
                let wallet = self.fee_wallet.clone();
                tokio::spawn(async move {
                    if let Err(e) = tokens.send_fee(&wallet, amount).await {
                        error!(%wallet, amount, error = %e, "fee transfer failed");
                    }
                });
            }

            Action::TransferTokens {
                wallet,
                tokens: token_amount,
                context,
            } => {
                let tokens = self.tokens.clone();
                let callback_tx = self.callback_tx.clone();
                tokio::spawn(async move {
                    let result = tokens.transfer(&wallet, token_amount).await;
                    match context {
                        TransferContext::UserPayout { reference, .. } => {
                            if let Err(ref e) = result {
                                error!(%reference, error = %e, "user payout transfer failed");
                            }
                            let _ = callback_tx.send(Event::UserTransferCompleted {
                                reference,
                                delivered: result.is_ok(),
                            });
                        }
                        TransferContext::PrizePayout { user_id, rank } => {
                            if let Err(e) = result {
                                error!(%user_id, rank, error = %e, "prize transfer failed");
                            }
                        }
                        TransferContext::VoterShare { user_id } => {
                            if let Err(e) = result {
                                error!(%user_id, error = %e, "voter share transfer failed");
                            }
                        }
                    }
                });
            }

            Action::QueryTreasuryBalance => {
                let treasury = self.treasury.clone();
                let callback_tx = self.callback_tx.clone();
                tokio::spawn(async move {
                    match treasury.balance().await {
                        Ok(balance) => {
                            let _ = callback_tx.send(Event::TreasuryBalanceFetched { balance });
                        }
                        Err(e) => {
                            // The treasury stays unseeded; the next process
                            // restart queries again.
                            error!(error = %e, "treasury balance query failed");
                        }
                    }
                });
            }

            Action::NotifyUser { user_id, notice } => {
                let sink = self.notifications.clone();
                tokio::spawn(async move {
                    sink.notify_user(user_id, notice).await;
                });
            }

            Action::Announce { announcement } => {
                let sink = self.notifications.clone();
                tokio::spawn(async move {
                    sink.announce(announcement).await;
                });
            }

            Action::PersistSnapshot => {
                let snapshot = self.state.snapshot();
                if let Err(e) = self.store.save(&snapshot) {
                    error!(error = %e, "snapshot write failed, continuing with in-memory state");
                }
            }
        }
    }
}
