//! Payment pipeline state.

use crate::validation::validate_payment;
use storypool_core::{Action, Event, Notice, TimerId, TransferContext};
use storypool_types::{
    EngineConfig, PaymentChoice, PaymentIntent, Reference, Settlement, TierParams, UserId,
    WalletAddress,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Token amounts produced by the post-purchase split.
#[derive(Debug, Clone, Copy)]
struct TokenSplit {
    user_tokens: u64,
    pool_tokens: u64,
}

/// In-flight settlement data between the confirm step and the final
/// registration, keyed by reference.
///
/// Deliberately not persisted: a crash mid-settlement leaves the intent
/// confirmed-but-unpaid, which is the same terminal state as a failed
/// purchase. The contributor is re-credited manually in that case.
#[derive(Debug, Clone)]
struct Settling {
    user_id: UserId,
    wallet: WalletAddress,
    display_name: String,
    choice: PaymentChoice,
    story: Option<String>,
    amount: f64,
    tier: TierParams,
    split: Option<TokenSplit>,
}

/// Payment pipeline state machine.
///
/// Handles the intent lifecycle from choice to settlement. Uses `HashMap`
/// since access is serialized through the event loop.
pub struct PipelineState {
    /// Intent registry, keyed by unique correlation reference.
    intents: HashMap<Reference, PaymentIntent>,

    /// Settlements between async legs (buy, transfer).
    settling: HashMap<Reference, Settling>,

    /// Current time (since unix epoch).
    now: Duration,

    config: Arc<EngineConfig>,
}

impl PipelineState {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        PipelineState {
            intents: HashMap::new(),
            settling: HashMap::new(),
            now: Duration::ZERO,
            config,
        }
    }

    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    /// The sweeper re-arm interval, for the node's startup scheduling.
    pub fn sweep_interval(&self) -> Duration {
        self.config.sweep_interval
    }

    /// Current intents, for snapshot assembly. Sorted by reference so the
    /// persisted form is deterministic.
    pub fn intents(&self) -> Vec<PaymentIntent> {
        let mut v: Vec<_> = self.intents.values().cloned().collect();
        v.sort_by(|a, b| a.reference.0.cmp(&b.reference.0));
        v
    }

    /// Restore intents from a recovered snapshot.
    pub fn restore(&mut self, intents: Vec<PaymentIntent>) {
        self.intents = intents
            .into_iter()
            .map(|i| (i.reference.clone(), i))
            .collect();
    }

    /// Handle a user picking a path in the front-end.
    ///
    /// `already_participant` is the story-submission guard input, supplied
    /// by the node from the lifecycle's participant set.
    ///
    /// A reference that already confirmed or paid is never replaced:
    /// resetting it to unconfirmed would let a redelivered confirmation
    /// signal run the whole settlement a second time. Unconfirmed intents
    /// may be reopened freely (the user changed their mind before paying).
    #[instrument(skip(self, story, display_name), fields(%user_id, %reference))]
    pub fn on_intent_opened(
        &mut self,
        user_id: UserId,
        reference: Reference,
        choice: PaymentChoice,
        story: Option<String>,
        display_name: String,
        already_participant: bool,
    ) -> Vec<Action> {
        if let Some(existing) = self.intents.get(&reference) {
            if existing.confirmed || existing.paid {
                tracing::warn!("intent reopen ignored: reference already confirmed");
                return vec![];
            }
        }

        if choice == PaymentChoice::Story {
            if already_participant {
                tracing::info!("story intent rejected: user already entered this round");
                return vec![Action::NotifyUser {
                    user_id,
                    notice: Notice::EntryRejected {
                        reason: "you already have an entry in this round".to_string(),
                    },
                }];
            }
            if let Some(text) = &story {
                let len = text.chars().count();
                if len < self.config.min_story_len || len > self.config.max_story_len {
                    tracing::info!(len, "story intent rejected: length out of bounds");
                    return vec![Action::NotifyUser {
                        user_id,
                        notice: Notice::EntryRejected {
                            reason: format!(
                                "story must be {}-{} characters",
                                self.config.min_story_len, self.config.max_story_len
                            ),
                        },
                    }];
                }
            }
        }

        self.intents.insert(
            reference.clone(),
            PaymentIntent {
                user_id,
                reference,
                choice,
                created_at_ms: self.now.as_millis() as u64,
                confirmed: false,
                paid: false,
                story,
                display_name,
            },
        );
        vec![Action::PersistSnapshot]
    }

    /// Handle an externally confirmed payment.
    ///
    /// Validation is fail-fast with no side effects. Confirmations are
    /// idempotent per reference: a second confirmation of an already
    /// confirmed intent is a success no-op.
    #[instrument(skip(self, amount_text, sender_wallet), fields(%user_id, %reference))]
    pub fn on_payment_confirmed(
        &mut self,
        reference: Reference,
        user_id: UserId,
        amount_text: &str,
        sender_wallet: &str,
    ) -> Vec<Action> {
        let (amount, wallet) =
            match validate_payment(&self.config, &reference, amount_text, sender_wallet) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(%err, "payment confirmation rejected");
                    return vec![Action::NotifyUser {
                        user_id,
                        notice: Notice::PaymentRejected {
                            reason: err.to_string(),
                        },
                    }];
                }
            };

        let now_ms = self.now.as_millis() as u64;
        let intent = self.intents.entry(reference.clone()).or_insert_with(|| {
            // Confirmation without a prior intent: the payment is real, so
            // take it, but we only know how to register it as a vote.
            tracing::info!("confirmation without intent, creating vote-choice fallback");
            PaymentIntent {
                user_id,
                reference: reference.clone(),
                choice: PaymentChoice::Vote,
                created_at_ms: now_ms,
                confirmed: false,
                paid: false,
                story: None,
                display_name: user_id.to_string(),
            }
        });
        if intent.confirmed {
            // At-most-once side effects per reference.
            tracing::debug!("duplicate confirmation ignored");
            return vec![];
        }
        intent.confirmed = true;

        let fee = amount * self.config.fee_rate;
        let purchase_amount = amount - fee;
        let tier = self.config.tiers.classify(amount);
        tracing::info!(
            amount,
            fee,
            purchase_amount,
            tier = %tier.label,
            "payment confirmed, starting market buy"
        );

        self.settling.insert(
            reference.clone(),
            Settling {
                user_id,
                wallet,
                display_name: intent.display_name.clone(),
                choice: intent.choice,
                story: intent.story.clone(),
                amount,
                tier,
                split: None,
            },
        );

        vec![
            Action::SendFee { amount: fee },
            Action::MarketBuy {
                reference,
                amount: purchase_amount,
            },
            Action::PersistSnapshot,
        ]
    }

    /// Handle completion of the external market buy.
    ///
    /// A failed or empty buy aborts settlement: the contributor is
    /// notified and the intent stays confirmed-but-unpaid. The runner
    /// already retried with fallback, so no retry happens here.
    #[instrument(skip(self), fields(%reference))]
    pub fn on_market_buy_completed(
        &mut self,
        reference: Reference,
        tokens_received: Option<u64>,
    ) -> Vec<Action> {
        let Some(settling) = self.settling.get_mut(&reference) else {
            tracing::warn!("buy completion for unknown settlement, ignoring");
            return vec![];
        };

        let tokens = match tokens_received {
            Some(t) if t > 0 => t,
            _ => {
                tracing::warn!("market buy failed or yielded zero tokens");
                let user_id = settling.user_id;
                self.settling.remove(&reference);
                return vec![Action::NotifyUser {
                    user_id,
                    notice: Notice::PurchaseFailed,
                }];
            }
        };

        // Tier split: floor rounding loses at most one unit to the user,
        // never to the total.
        let user_tokens = (tokens as f64 * settling.tier.retention).floor() as u64;
        let pool_tokens = tokens - user_tokens;
        settling.split = Some(TokenSplit {
            user_tokens,
            pool_tokens,
        });
        tracing::info!(tokens, user_tokens, pool_tokens, "buy complete, paying contributor");

        vec![Action::TransferTokens {
            wallet: settling.wallet.clone(),
            tokens: user_tokens,
            context: TransferContext::UserPayout {
                reference,
                user_id: settling.user_id,
            },
        }]
    }

    /// Handle completion of the contributor's payout transfer.
    ///
    /// On failure the pool is **not** credited even though the purchase
    /// succeeded; the purchase is considered incomplete from the
    /// contributor's perspective. Known asymmetric-risk edge, kept
    /// pending a product decision.
    #[instrument(skip(self), fields(%reference, delivered))]
    pub fn on_user_transfer_completed(
        &mut self,
        reference: Reference,
        delivered: bool,
    ) -> Vec<Action> {
        let Some(settling) = self.settling.remove(&reference) else {
            tracing::warn!("transfer completion for unknown settlement, ignoring");
            return vec![];
        };

        if !delivered {
            tracing::warn!("contributor payout transfer failed, settlement aborted");
            return vec![Action::NotifyUser {
                user_id: settling.user_id,
                notice: Notice::TransferFailed,
            }];
        }

        let split = match settling.split {
            Some(s) => s,
            None => {
                tracing::error!("transfer completed before buy, dropping");
                return vec![];
            }
        };

        if let Some(intent) = self.intents.get_mut(&reference) {
            intent.paid = true;
        }

        let round_pool_share =
            (split.pool_tokens as f64 * self.config.pool_share).floor() as u64;
        let treasury_share = split.pool_tokens - round_pool_share;
        tracing::info!(
            user_tokens = split.user_tokens,
            round_pool_share,
            treasury_share,
            "contribution settled"
        );

        vec![Action::EnqueueInternal {
            event: Event::ContributionSettled {
                settlement: Settlement {
                    user_id: settling.user_id,
                    wallet: settling.wallet,
                    display_name: settling.display_name,
                    choice: settling.choice,
                    story: settling.story,
                    amount: settling.amount,
                    tier: settling.tier,
                    user_tokens: split.user_tokens,
                    round_pool_share,
                    treasury_share,
                },
            },
        }]
    }

    /// Periodic expiry sweep.
    ///
    /// Evicts unconfirmed intents older than the timeout (age measured
    /// from `created_at`, falling back to the round start) and notifies
    /// their owners. Paid or confirmed intents are never expired.
    #[instrument(skip(self, round_started_at))]
    pub fn on_sweep_timer(&mut self, round_started_at: Duration) -> Vec<Action> {
        let timeout_ms = self.config.intent_timeout.as_millis() as u64;
        let now_ms = self.now.as_millis() as u64;
        let round_start_ms = round_started_at.as_millis() as u64;

        let expired: Vec<Reference> = self
            .intents
            .values()
            .filter(|i| !i.confirmed && !i.paid)
            .filter(|i| {
                let born = if i.created_at_ms > 0 {
                    i.created_at_ms
                } else {
                    round_start_ms
                };
                now_ms.saturating_sub(born) > timeout_ms
            })
            .map(|i| i.reference.clone())
            .collect();

        let mut actions = Vec::new();
        for reference in &expired {
            if let Some(intent) = self.intents.remove(reference) {
                tracing::info!(%reference, user_id = %intent.user_id, "payment intent expired");
                actions.push(Action::NotifyUser {
                    user_id: intent.user_id,
                    notice: Notice::IntentExpired,
                });
            }
        }
        if !expired.is_empty() {
            actions.push(Action::PersistSnapshot);
        }

        // Re-arm: sweep timers are single-shot like all others.
        actions.push(Action::SetTimer {
            id: TimerId::Sweep,
            duration: self.config.sweep_interval,
        });
        actions
    }

    /// Drop the round's intents after winners were announced.
    pub fn on_round_closed(&mut self) {
        self.intents.clear();
        self.settling.clear();
    }
}
