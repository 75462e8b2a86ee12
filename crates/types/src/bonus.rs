//! Treasury bonus payout schedule.
//!
//! The bonus paid to a round's top winner is a percentage of the permanent
//! treasury. The percentage is a decreasing step function of treasury size
//! so that payouts stay bounded as the treasury grows.

/// Ordered (threshold, percentage) lookup table.
///
/// An entry applies to any treasury balance at or above its threshold;
/// the highest matching threshold wins.
#[derive(Debug, Clone)]
pub struct BonusSchedule {
    bands: Vec<(u64, f64)>,
}

impl Default for BonusSchedule {
    fn default() -> Self {
        BonusSchedule {
            bands: vec![
                (0, 0.20),
                (100_000, 0.12),
                (500_000, 0.08),
                (2_000_000, 0.04),
                (10_000_000, 0.02),
            ],
        }
    }
}

impl BonusSchedule {
    /// Percentage of the treasury paid out as a bonus at this balance.
    pub fn percentage(&self, treasury: u64) -> f64 {
        self.bands
            .iter()
            .rev()
            .find(|(threshold, _)| treasury >= *threshold)
            .map(|(_, pct)| *pct)
            .unwrap_or(0.0)
    }

    /// Bonus amount for the given treasury balance (floored).
    ///
    /// Never exceeds the balance itself: the schedule's percentages are
    /// all below 1.0 and the result is floored.
    pub fn amount(&self, treasury: u64) -> u64 {
        (treasury as f64 * self.percentage(treasury)).floor() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_decreases_with_treasury_size() {
        let s = BonusSchedule::default();
        let mut prev = 1.0;
        for balance in [0, 99_999, 100_000, 499_999, 500_000, 2_000_000, 10_000_000] {
            let pct = s.percentage(balance);
            assert!(pct <= prev, "schedule increased at {balance}");
            prev = pct;
        }
        assert_eq!(s.percentage(50_000), 0.20);
        assert_eq!(s.percentage(20_000_000), 0.02);
    }

    #[test]
    fn amount_is_floored_and_bounded() {
        let s = BonusSchedule::default();
        assert_eq!(s.amount(1_001), 200); // 20% of 1001 = 200.2
        for balance in [0u64, 1, 999_999, 123_456_789] {
            assert!(s.amount(balance) <= balance);
        }
    }
}
