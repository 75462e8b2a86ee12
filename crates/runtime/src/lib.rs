//! Async runtime for the engine.
//!
//! Hosts the deterministic state machine inside a tokio event loop: a
//! single task owns the machine and receives events over mpsc channels,
//! so every mutation is serialized. Slow external work (market buys,
//! token transfers) runs in spawned tasks and feeds its result back as a
//! callback event.

mod retry;
mod runner;
mod services;
mod snapshot;
mod telemetry;
mod timers;

pub use retry::{retry_with_backoff, RetryConfig};
pub use runner::{EngineRunner, RunnerError, RunnerHandle, ShutdownHandle};
pub use services::{
    MarketService, NotificationSink, ServiceError, TokenService, TreasuryService,
};
pub use snapshot::{FileSnapshotStore, SnapshotError, SnapshotStore};
pub use telemetry::init_telemetry;
pub use timers::TimerManager;
