//! Treasury bonus lottery.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Uniform 1-in-N draw deciding whether the round's top winner receives a
/// treasury bonus.
///
/// The RNG is injected (seedable) so the draw is deterministic in tests.
/// ChaCha8 is more than good enough to prevent trivial prediction; this is
/// a promotional mechanic, not a financial guarantee, so cryptographic
/// strength is not required.
#[derive(Debug, Clone)]
pub struct BonusLottery {
    rng: ChaCha8Rng,
    odds: u32,
}

impl BonusLottery {
    /// Lottery with OS-entropy seeding, for production.
    pub fn new(odds: u32) -> Self {
        BonusLottery {
            rng: ChaCha8Rng::from_entropy(),
            odds: odds.max(1),
        }
    }

    /// Lottery with a fixed seed, for deterministic tests.
    pub fn with_seed(odds: u32, seed: u64) -> Self {
        BonusLottery {
            rng: ChaCha8Rng::seed_from_u64(seed),
            odds: odds.max(1),
        }
    }

    /// Draw once. Invoked exactly once per round, at winner announcement.
    pub fn roll(&mut self) -> bool {
        self.rng.gen_range(0..self.odds) == 0
    }
}
