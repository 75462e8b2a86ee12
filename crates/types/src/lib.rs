//! Core types for the storypool round engine.
//!
//! This crate provides the foundational types used throughout the engine:
//!
//! - **Identifiers**: UserId, Reference, WalletAddress
//! - **Reward tables**: tier classification and the treasury bonus schedule
//! - **Round state**: PaymentIntent, Participant, Voter, RoundPhase
//! - **Persistence**: RoundSnapshot (the crash-recovery unit)
//! - **Configuration**: EngineConfig
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.

mod bonus;
mod config;
mod identifiers;
mod round;
mod snapshot;
mod tier;

pub use bonus::BonusSchedule;
pub use config::{ConfigError, EngineConfig};
pub use identifiers::{Reference, UserId, WalletAddress, WalletError};
pub use round::{
    Participant, PaymentChoice, PaymentIntent, RoundPhase, Settlement, Voter,
};
pub use snapshot::RoundSnapshot;
pub use tier::{Curve, TierBand, TierParams, TierTable};
