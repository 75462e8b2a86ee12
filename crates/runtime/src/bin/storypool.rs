//! Storypool engine node.
//!
//! Runs the round engine with file-backed snapshots. The chain and chat
//! integrations are library seams ([`MarketService`], [`TokenService`],
//! [`TreasuryService`], [`NotificationSink`]); deployments embed
//! [`EngineRunner`] and supply real implementations. This binary wires
//! dry-run stand-ins so the engine can be exercised locally end to end.
//!
//! # Usage
//!
//! ```bash
//! # Start with configuration file
//! storypool --config engine.toml
//!
//! # Override the snapshot path
//! storypool --config engine.toml --snapshot /var/lib/storypool/snapshot.json
//! ```
//!
//! # Configuration
//!
//! Example TOML:
//!
//! ```toml
//! [phases]
//! submission_secs = 300
//! cooldown_secs = 60
//! per_entrant_vote_secs = 120
//! decision_buffer_secs = 60
//!
//! [economics]
//! fee_rate = 0.10
//! pool_share = 0.65
//! prize_pool_share = 0.80
//! bonus_odds = 500
//! fee_wallet = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU" # required
//!
//! [storage]
//! snapshot_path = "./storypool-snapshot.json"
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storypool_core::{Announcement, Notice};
use storypool_runtime::{
    init_telemetry, EngineRunner, FileSnapshotStore, MarketService, NotificationSink,
    ServiceError, TokenService, TreasuryService,
};
use storypool_types::{EngineConfig, UserId, WalletAddress};
use tokio::signal;
use tracing::info;

/// Storypool round engine node.
#[derive(Parser, Debug)]
#[command(name = "storypool")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Snapshot file path (overrides config)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Top-level engine configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
struct EngineToml {
    #[serde(default)]
    phases: PhasesToml,
    #[serde(default)]
    economics: EconomicsToml,
    #[serde(default)]
    limits: LimitsToml,
    #[serde(default)]
    storage: StorageToml,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PhasesToml {
    submission_secs: Option<u64>,
    cooldown_secs: Option<u64>,
    per_entrant_vote_secs: Option<u64>,
    decision_buffer_secs: Option<u64>,
    startup_grace_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EconomicsToml {
    fee_rate: Option<f64>,
    pool_share: Option<f64>,
    prize_pool_share: Option<f64>,
    bonus_odds: Option<u32>,
    fee_wallet: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LimitsToml {
    min_amount: Option<f64>,
    max_amount: Option<f64>,
    min_story_len: Option<usize>,
    max_story_len: Option<usize>,
    intent_timeout_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StorageToml {
    snapshot_path: Option<PathBuf>,
}

impl EngineToml {
    /// Overlay the file's values onto the engine defaults.
    fn into_config(self) -> Result<EngineConfig> {
        let mut config = EngineConfig::default();
        let secs = Duration::from_secs;

        if let Some(v) = self.phases.submission_secs {
            config.submission_duration = secs(v);
        }
        if let Some(v) = self.phases.cooldown_secs {
            config.cooldown_duration = secs(v);
        }
        if let Some(v) = self.phases.per_entrant_vote_secs {
            config.per_entrant_vote_time = secs(v);
        }
        if let Some(v) = self.phases.decision_buffer_secs {
            config.decision_buffer = secs(v);
        }
        if let Some(v) = self.phases.startup_grace_secs {
            config.startup_grace = secs(v);
        }
        if let Some(v) = self.economics.fee_rate {
            config.fee_rate = v;
        }
        if let Some(v) = self.economics.pool_share {
            config.pool_share = v;
        }
        if let Some(v) = self.economics.prize_pool_share {
            config.prize_pool_share = v;
        }
        if let Some(v) = self.economics.bonus_odds {
            config.bonus_odds = v;
        }
        if let Some(addr) = self.economics.fee_wallet {
            let wallet = WalletAddress::parse(&addr).context("invalid fee_wallet address")?;
            config.fee_wallet = Some(wallet);
        }
        if let Some(v) = self.limits.min_amount {
            config.min_amount = v;
        }
        if let Some(v) = self.limits.max_amount {
            config.max_amount = v;
        }
        if let Some(v) = self.limits.min_story_len {
            config.min_story_len = v;
        }
        if let Some(v) = self.limits.max_story_len {
            config.max_story_len = v;
        }
        if let Some(v) = self.limits.intent_timeout_secs {
            config.intent_timeout = secs(v);
        }
        if let Some(v) = self.limits.sweep_interval_secs {
            config.sweep_interval = secs(v);
        }

        config.validate().context("invalid engine configuration")?;
        Ok(config)
    }
}

/// Dry-run market: reports a fixed token yield without touching a chain.
struct DryRunMarket;

#[async_trait::async_trait]
impl MarketService for DryRunMarket {
    async fn buy(&self, amount: f64) -> Result<u64, ServiceError> {
        // Pretend 1 unit of contribution buys 50k tokens.
        Ok((amount * 50_000.0).floor() as u64)
    }
}

/// Dry-run token custody: every transfer succeeds.
struct DryRunTokens;

#[async_trait::async_trait]
impl TokenService for DryRunTokens {
    async fn transfer(&self, wallet: &WalletAddress, tokens: u64) -> Result<(), ServiceError> {
        info!(%wallet, tokens, "dry-run token transfer");
        Ok(())
    }

    async fn send_fee(&self, wallet: &WalletAddress, amount: f64) -> Result<(), ServiceError> {
        info!(%wallet, amount, "dry-run fee transfer");
        Ok(())
    }
}

struct DryRunTreasury;

#[async_trait::async_trait]
impl TreasuryService for DryRunTreasury {
    async fn balance(&self) -> Result<u64, ServiceError> {
        Ok(0)
    }
}

/// Log-only notification sink.
struct LogSink;

#[async_trait::async_trait]
impl NotificationSink for LogSink {
    async fn notify_user(&self, user_id: UserId, notice: Notice) {
        info!(%user_id, ?notice, "user notice");
    }

    async fn announce(&self, announcement: Announcement) {
        info!(?announcement, "announcement");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli.log_level);

    let raw = fs::read_to_string(&cli.config)
        .with_context(|| format!("reading config file {}", cli.config.display()))?;
    let file: EngineToml = toml::from_str(&raw).context("parsing config file")?;

    let snapshot_path = cli
        .snapshot
        .or(file.storage.snapshot_path.clone())
        .unwrap_or_else(|| PathBuf::from("storypool-snapshot.json"));
    let config = Arc::new(file.into_config()?);

    info!(
        snapshot = %snapshot_path.display(),
        submission_secs = config.submission_duration.as_secs(),
        bonus_odds = config.bonus_odds,
        "starting storypool engine"
    );

    let store = Arc::new(FileSnapshotStore::new(snapshot_path));
    let mut runner = EngineRunner::new(
        config,
        store,
        Arc::new(DryRunMarket),
        Arc::new(DryRunTokens),
        Arc::new(DryRunTreasury),
        Arc::new(LogSink),
    )?;

    let shutdown = runner
        .shutdown_handle()
        .context("shutdown handle already taken")?;
    let task = tokio::spawn(runner.run());

    signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("ctrl-c received, shutting down");
    shutdown.shutdown();
    task.await.context("runner task panicked")??;
    Ok(())
}
