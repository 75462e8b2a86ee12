//! Engine configuration.

use crate::{BonusSchedule, TierTable, WalletAddress};
use std::time::Duration;
use thiserror::Error;

/// Errors from configuration validation. All of these are unrecoverable
/// at startup: the process must not start with a broken config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be in (0, 1), got {value}")]
    RatioOutOfRange { name: &'static str, value: f64 },
    #[error("bonus odds denominator must be >= 1")]
    ZeroOdds,
    #[error("amount range is empty ({min} >= {max})")]
    EmptyAmountRange { min: f64, max: f64 },
    #[error("story length bounds are empty ({min} >= {max})")]
    EmptyStoryBounds { min: usize, max: usize },
    #[error("fee destination wallet is not configured")]
    MissingFeeWallet,
}

/// All tunable engine parameters.
///
/// Defaults match the production deployment; tests override individual
/// fields to compress timings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Length of the Submission phase.
    pub submission_duration: Duration,
    /// Length of the Cooldown phase.
    pub cooldown_duration: Duration,
    /// Per-entrant voting time when duration hints are missing.
    pub per_entrant_vote_time: Duration,
    /// Flat decision buffer added to the sum of duration hints.
    pub decision_buffer: Duration,
    /// Delay before the first round opens on a cold start.
    pub startup_grace: Duration,

    /// Fraction of each contribution taken as a fee.
    pub fee_rate: f64,
    /// Fraction of pool tokens credited to the round pool; the rest goes
    /// to the permanent treasury.
    pub pool_share: f64,
    /// Fraction of the round pool distributed to ranked winners; the rest
    /// forms the voter pool.
    pub prize_pool_share: f64,
    /// Bonus lottery odds: 1-in-`bonus_odds` per round.
    pub bonus_odds: u32,

    /// Valid contribution amount range, inclusive.
    pub min_amount: f64,
    pub max_amount: f64,
    /// Story length bounds in characters, inclusive.
    pub min_story_len: usize,
    pub max_story_len: usize,

    /// Unconfirmed intents older than this are evicted.
    pub intent_timeout: Duration,
    /// Expiry sweeper period.
    pub sweep_interval: Duration,

    /// Market-buy retry budget.
    pub buy_max_retries: u32,
    /// Base delay for exponential backoff between buy retries.
    pub buy_backoff_base: Duration,
    /// Per-call timeout for external service calls.
    pub call_timeout: Duration,

    pub tiers: TierTable,
    pub bonus: BonusSchedule,
    /// Fee destination. `None` fails [`validate`](Self::validate) and is
    /// only acceptable in tests, which skip validation.
    pub fee_wallet: Option<WalletAddress>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            submission_duration: Duration::from_secs(5 * 60),
            cooldown_duration: Duration::from_secs(60),
            per_entrant_vote_time: Duration::from_secs(120),
            decision_buffer: Duration::from_secs(60),
            startup_grace: Duration::from_secs(10),
            fee_rate: 0.10,
            pool_share: 0.65,
            prize_pool_share: 0.80,
            bonus_odds: 500,
            min_amount: 0.001,
            max_amount: 100.0,
            min_story_len: 10,
            max_story_len: 2000,
            intent_timeout: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(2 * 60),
            buy_max_retries: 3,
            buy_backoff_base: Duration::from_millis(500),
            call_timeout: Duration::from_secs(30),
            tiers: TierTable::default(),
            bonus: BonusSchedule::default(),
            fee_wallet: None,
        }
    }
}

impl EngineConfig {
    /// Validate cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("fee_rate", self.fee_rate),
            ("pool_share", self.pool_share),
            ("prize_pool_share", self.prize_pool_share),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::RatioOutOfRange { name, value });
            }
        }
        if self.bonus_odds == 0 {
            return Err(ConfigError::ZeroOdds);
        }
        if self.min_amount >= self.max_amount {
            return Err(ConfigError::EmptyAmountRange {
                min: self.min_amount,
                max: self.max_amount,
            });
        }
        if self.min_story_len >= self.max_story_len {
            return Err(ConfigError::EmptyStoryBounds {
                min: self.min_story_len,
                max: self.max_story_len,
            });
        }
        if self.fee_wallet.is_none() {
            return Err(ConfigError::MissingFeeWallet);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEE_WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    fn deployed_config() -> EngineConfig {
        EngineConfig {
            fee_wallet: Some(WalletAddress::parse(FEE_WALLET).unwrap()),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn defaults_with_a_fee_wallet_are_valid() {
        assert!(deployed_config().validate().is_ok());
    }

    #[test]
    fn rejects_missing_fee_wallet() {
        assert!(matches!(
            EngineConfig::default().validate(),
            Err(ConfigError::MissingFeeWallet)
        ));
    }

    #[test]
    fn rejects_out_of_range_ratios() {
        let mut cfg = deployed_config();
        cfg.fee_rate = 1.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RatioOutOfRange { name: "fee_rate", .. })
        ));
    }
}
