//! Shared scenario helpers.
#![allow(dead_code)]

use storypool_core::Event;
use storypool_simulation::SimRunner;
use storypool_types::{EngineConfig, PaymentChoice, Reference, RoundPhase, UserId};
use std::sync::Arc;
use std::time::Duration;

/// Distinct valid base58 wallets, one per low user id.
pub const WALLETS: [&str; 4] = [
    "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsA",
    "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsB",
    "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsC",
    "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsD",
];

pub fn sim() -> SimRunner {
    let mut sim = SimRunner::new(Arc::new(EngineConfig::default()), 42);
    sim.settle();
    sim
}

/// Advance through the startup grace delay into the first Submission phase.
pub fn enter_submission(sim: &mut SimRunner) {
    sim.advance(Duration::from_secs(10));
    assert_eq!(sim.phase(), RoundPhase::Submission);
}

pub fn open_intent(
    sim: &mut SimRunner,
    user: u64,
    reference: &str,
    choice: PaymentChoice,
    story: Option<&str>,
) {
    sim.submit(Event::IntentOpened {
        user_id: UserId(user),
        reference: Reference::from(reference),
        choice,
        story: story.map(str::to_string),
        display_name: format!("user{user}"),
    });
    sim.settle();
}

pub fn confirm(sim: &mut SimRunner, user: u64, reference: &str, amount: &str) {
    sim.submit(Event::PaymentConfirmed {
        reference: Reference::from(reference),
        user_id: UserId(user),
        amount: amount.to_string(),
        sender_wallet: WALLETS[user as usize % WALLETS.len()].to_string(),
    });
    sim.settle();
}

/// Open an intent and run the full payment pipeline to settlement.
pub fn pay(
    sim: &mut SimRunner,
    user: u64,
    reference: &str,
    choice: PaymentChoice,
    story: Option<&str>,
) {
    open_intent(sim, user, reference, choice, story);
    confirm(sim, user, reference, "0.02");
}

pub fn vote(sim: &mut SimRunner, voter: u64, target: u64) {
    sim.submit(Event::VoteCast {
        voter: UserId(voter),
        target: UserId(target),
    });
    sim.settle();
}
