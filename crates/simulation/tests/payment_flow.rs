//! Payment pipeline scenarios: dedup, split arithmetic, failure legs,
//! intent expiry.

mod common;

use common::{confirm, enter_submission, open_intent, pay, sim};
use storypool_core::{Notice, TransferContext};
use storypool_types::{PaymentChoice, UserId};
use std::time::Duration;

const STORY: Option<&str> = Some("once upon a time in the story pool");

#[test]
fn settled_payment_splits_fee_purchase_and_pools() {
    let mut s = sim();
    enter_submission(&mut s);
    pay(&mut s, 1, "ref-1", PaymentChoice::Story, STORY);

    // 0.02 contribution: 10% fee, 90% spent on the buy.
    assert_eq!(s.fee_payments, vec![0.02 * 0.10]);

    // 1000 tokens bought, Basic tier keeps 50%.
    let user_payout: Vec<u64> = s
        .transfers
        .iter()
        .filter_map(|(_, tokens, ctx)| {
            matches!(ctx, TransferContext::UserPayout { .. }).then_some(*tokens)
        })
        .collect();
    assert_eq!(user_payout, vec![500]);

    // Remaining 500 split 65/35 between round pool and treasury.
    let snapshot = s.snapshot();
    assert_eq!(snapshot.round_pool, 325);
    assert_eq!(snapshot.treasury, 175);
    assert!(snapshot.intents[0].paid);
}

#[test]
fn duplicate_confirmation_is_ignored() {
    let mut s = sim();
    enter_submission(&mut s);
    pay(&mut s, 1, "ref-1", PaymentChoice::Story, STORY);
    let pool = s.snapshot().round_pool;

    confirm(&mut s, 1, "ref-1", "0.02");

    // No second fee, no second buy, no extra pool credit.
    assert_eq!(s.fee_payments.len(), 1);
    assert_eq!(s.snapshot().round_pool, pool);
    assert_eq!(s.snapshot().participants.len(), 1);
}

#[test]
fn reopening_a_settled_reference_does_not_reprocess_payment() {
    let mut s = sim();
    enter_submission(&mut s);
    pay(&mut s, 1, "ref-1", PaymentChoice::Story, STORY);
    assert_eq!(s.fee_payments.len(), 1);

    // Reopen the settled reference, then redeliver its confirmation signal.
    open_intent(&mut s, 1, "ref-1", PaymentChoice::Vote, None);
    confirm(&mut s, 1, "ref-1", "0.02");

    // Exactly one fee, one settlement, one pool credit per reference.
    assert_eq!(s.fee_payments.len(), 1);
    let snapshot = s.snapshot();
    assert_eq!(snapshot.round_pool, 325);
    assert_eq!(snapshot.intents.len(), 1);
    assert!(snapshot.intents[0].paid);
    assert_eq!(snapshot.participants.len(), 1);
}

#[test]
fn invalid_amount_is_rejected_without_mutation() {
    let mut s = sim();
    enter_submission(&mut s);
    open_intent(&mut s, 1, "ref-1", PaymentChoice::Story, STORY);

    confirm(&mut s, 1, "ref-1", "abc");
    assert!(s
        .notices
        .iter()
        .any(|(u, n)| *u == UserId(1) && matches!(n, Notice::PaymentRejected { .. })));
    assert!(s.fee_payments.is_empty());
    assert!(!s.snapshot().intents[0].confirmed);

    // The intent is still usable by a valid retry.
    confirm(&mut s, 1, "ref-1", "0.02");
    assert!(s.snapshot().intents[0].paid);
}

#[test]
fn failed_buy_leaves_intent_confirmed_but_unpaid() {
    let mut s = sim();
    enter_submission(&mut s);
    open_intent(&mut s, 1, "ref-1", PaymentChoice::Story, STORY);
    s.script_buy(None);

    confirm(&mut s, 1, "ref-1", "0.02");

    assert!(s
        .notices
        .iter()
        .any(|(u, n)| *u == UserId(1) && matches!(n, Notice::PurchaseFailed)));
    let snapshot = s.snapshot();
    assert!(snapshot.intents[0].confirmed);
    assert!(!snapshot.intents[0].paid);
    assert_eq!(snapshot.round_pool, 0);
    assert!(snapshot.participants.is_empty());
}

#[test]
fn failed_user_transfer_skips_registration_and_pool_credit() {
    let mut s = sim();
    enter_submission(&mut s);
    open_intent(&mut s, 1, "ref-1", PaymentChoice::Story, STORY);
    s.script_transfer(false);

    confirm(&mut s, 1, "ref-1", "0.02");

    assert!(s
        .notices
        .iter()
        .any(|(u, n)| *u == UserId(1) && matches!(n, Notice::TransferFailed)));
    let snapshot = s.snapshot();
    assert_eq!(snapshot.round_pool, 0);
    assert_eq!(snapshot.treasury, 0);
    assert!(snapshot.participants.is_empty());
}

#[test]
fn tier_scales_with_contribution_amount() {
    let mut s = sim();
    enter_submission(&mut s);

    // 0.25 lands in the High band: 60% retention.
    open_intent(&mut s, 1, "ref-1", PaymentChoice::Vote, None);
    confirm(&mut s, 1, "ref-1", "0.25");

    let user_payout: Vec<u64> = s
        .transfers
        .iter()
        .filter_map(|(_, tokens, ctx)| {
            matches!(ctx, TransferContext::UserPayout { .. }).then_some(*tokens)
        })
        .collect();
    assert_eq!(user_payout, vec![600]);
    assert_eq!(s.snapshot().voters[0].tier_label, "High");
}

#[test]
fn sweeper_evicts_only_stale_unconfirmed_intents() {
    let mut s = sim();
    enter_submission(&mut s);
    open_intent(&mut s, 1, "ref-stale", PaymentChoice::Vote, None);
    pay(&mut s, 2, "ref-paid", PaymentChoice::Vote, None);

    // Just before the 10 minute timeout nothing is evicted.
    s.advance(Duration::from_secs(9 * 60));
    assert_eq!(s.snapshot().intents.len(), 2);

    // Past the timeout the unconfirmed intent goes; the paid one stays.
    s.advance(Duration::from_secs(3 * 60));
    let snapshot = s.snapshot();
    assert_eq!(snapshot.intents.len(), 1);
    assert_eq!(snapshot.intents[0].reference.0, "ref-paid");
    assert!(s
        .notices
        .iter()
        .any(|(u, n)| *u == UserId(1) && matches!(n, Notice::IntentExpired)));
}
