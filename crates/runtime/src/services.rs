//! External service seams.
//!
//! The engine core never performs I/O; these traits are the boundary the
//! runner crosses on its behalf. Deployments plug in real chain and chat
//! integrations; tests and the dev binary plug in local stand-ins.

use storypool_core::{Announcement, Notice};
use storypool_types::{UserId, WalletAddress};
use thiserror::Error;

/// Errors from external service calls.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The call failed in a way a retry might fix.
    #[error("transient service failure: {0}")]
    Transient(String),
    /// The call failed permanently; retrying is pointless.
    #[error("permanent service failure: {0}")]
    Permanent(String),
}

/// Buys the pooled reward token on the open market.
#[async_trait::async_trait]
pub trait MarketService: Send + Sync + 'static {
    /// Spend `amount` of the contribution currency; returns tokens received.
    ///
    /// Must be safe to retry: the runner retries transient failures with
    /// backoff, so a partial execution that already settled must surface
    /// as success, not as a second buy.
    async fn buy(&self, amount: f64) -> Result<u64, ServiceError>;
}

/// Transfers the pooled reward token out of the engine's custody wallet.
#[async_trait::async_trait]
pub trait TokenService: Send + Sync + 'static {
    async fn transfer(&self, wallet: &WalletAddress, tokens: u64) -> Result<(), ServiceError>;

    /// Send the fee cut to the configured fee wallet, denominated in the
    /// contribution currency.
    async fn send_fee(&self, wallet: &WalletAddress, amount: f64) -> Result<(), ServiceError>;
}

/// Reads the treasury account balance (cold-start seeding only).
#[async_trait::async_trait]
pub trait TreasuryService: Send + Sync + 'static {
    async fn balance(&self) -> Result<u64, ServiceError>;
}

/// Delivers notices and announcements to the chat front-end.
///
/// Fire-and-forget: the runner logs failures and never feeds them back
/// into the state machine.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn notify_user(&self, user_id: UserId, notice: Notice);

    async fn announce(&self, announcement: Announcement);
}
