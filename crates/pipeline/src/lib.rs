//! Payment pipeline state machine.
//!
//! Owns the payment-intent registry and drives confirmed payments through
//! validation, the tiered fee/purchase split, the external market buy, the
//! contributor payout, and finally registration, emitting a
//! `ContributionSettled` internal event for the round lifecycle.
//!
//! Also hosts the expiry sweeper that evicts stale unconfirmed intents.

mod state;
mod validation;

pub use state::PipelineState;
pub use validation::{validate_payment, ValidationError};
