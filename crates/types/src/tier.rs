//! Contribution tier classification.
//!
//! Maps a contribution amount to reward parameters: what fraction of the
//! purchased tokens the contributor keeps (`retention`) and the prize
//! multiplier applied if they win. Classification is a pure function of
//! the amount: no side effects, same input always yields the same output.
//!
//! Bands are held in an ordered lookup table rather than chained
//! conditionals so that boundary behavior is easy to enumerate in tests.

use serde::{Deserialize, Serialize};

/// Reward parameters produced by classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierParams {
    /// Fraction of purchased tokens kept by the contributor, in (0, 1).
    pub retention: f64,
    /// Prize multiplier applied to this contributor's winnings, >= 1.
    pub multiplier: f64,
    /// Human-readable tier name.
    pub label: String,
    /// Badge shown next to the contributor's entry.
    pub badge: String,
}

/// How a parameter varies with the contribution amount inside a band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    /// Constant across the whole band.
    Flat(f64),
    /// Linear ramp between two amounts, clamped at both ends.
    ///
    /// Below `from_amount` the value is `from`; at or above `to_amount`
    /// it is `to`; in between it is interpolated linearly. This makes the
    /// top band continuous in the amount instead of a step.
    Linear {
        from_amount: f64,
        to_amount: f64,
        from: f64,
        to: f64,
    },
}

impl Curve {
    /// Evaluate the curve at the given amount.
    pub fn eval(&self, amount: f64) -> f64 {
        match *self {
            Curve::Flat(v) => v,
            Curve::Linear {
                from_amount,
                to_amount,
                from,
                to,
            } => {
                if amount <= from_amount {
                    from
                } else if amount >= to_amount {
                    to
                } else {
                    let t = (amount - from_amount) / (to_amount - from_amount);
                    from + t * (to - from)
                }
            }
        }
    }
}

/// One band of the tier table.
#[derive(Debug, Clone)]
pub struct TierBand {
    /// Inclusive lower amount bound of this band.
    pub min_amount: f64,
    pub label: &'static str,
    pub badge: &'static str,
    pub retention: Curve,
    pub multiplier: Curve,
}

/// Ordered tier lookup table.
///
/// Bands are sorted by ascending `min_amount` with no gaps or overlaps:
/// an amount belongs to the last band whose `min_amount` it reaches.
#[derive(Debug, Clone)]
pub struct TierTable {
    bands: Vec<TierBand>,
}

impl Default for TierTable {
    fn default() -> Self {
        TierTable {
            bands: vec![
                TierBand {
                    min_amount: 0.0,
                    label: "Basic",
                    badge: "🌱",
                    retention: Curve::Flat(0.50),
                    multiplier: Curve::Flat(1.00),
                },
                TierBand {
                    min_amount: 0.05,
                    label: "Mid",
                    badge: "⭐",
                    retention: Curve::Flat(0.55),
                    multiplier: Curve::Flat(1.05),
                },
                TierBand {
                    min_amount: 0.20,
                    label: "High",
                    badge: "🔥",
                    retention: Curve::Flat(0.60),
                    multiplier: Curve::Flat(1.10),
                },
                TierBand {
                    min_amount: 0.50,
                    label: "Whale",
                    badge: "🐋",
                    retention: Curve::Linear {
                        from_amount: 0.50,
                        to_amount: 5.00,
                        from: 0.65,
                        to: 0.75,
                    },
                    multiplier: Curve::Linear {
                        from_amount: 0.50,
                        to_amount: 5.00,
                        from: 1.15,
                        to: 1.50,
                    },
                },
            ],
        }
    }
}

impl TierTable {
    /// Classify a contribution amount.
    ///
    /// The amount is assumed to be inside the configured valid range;
    /// range enforcement happens during payment validation, before
    /// classification is reached.
    pub fn classify(&self, amount: f64) -> TierParams {
        // Last band whose lower bound the amount reaches. The first band
        // starts at 0.0, so the search always matches.
        let band = self
            .bands
            .iter()
            .rev()
            .find(|b| amount >= b.min_amount)
            .unwrap_or(&self.bands[0]);
        TierParams {
            retention: band.retention.eval(amount),
            multiplier: band.multiplier.eval(amount),
            label: band.label.to_string(),
            badge: band.badge.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tier_scenario() {
        let t = TierTable::default();
        let p = t.classify(0.02);
        assert_eq!(p.label, "Basic");
        assert_eq!(p.retention, 0.50);
        assert_eq!(p.multiplier, 1.00);
    }

    #[test]
    fn whale_interpolation_is_strictly_inside_bounds() {
        let t = TierTable::default();
        let p = t.classify(0.6);
        assert_eq!(p.label, "Whale");
        assert!(p.retention > 0.65 && p.retention < 0.75, "{}", p.retention);
        assert!(
            p.multiplier > 1.15 && p.multiplier < 1.50,
            "{}",
            p.multiplier
        );
        // Exact interpolation formula: floor + (a-floor)/(sat-floor) * span
        let expected = 0.65 + (0.6 - 0.5) / (5.0 - 0.5) * (0.75 - 0.65);
        assert!((p.retention - expected).abs() < 1e-12);
    }

    #[test]
    fn whale_saturates_at_max() {
        let t = TierTable::default();
        let p = t.classify(50.0);
        assert_eq!(p.retention, 0.75);
        assert_eq!(p.multiplier, 1.50);
    }

    #[test]
    fn retention_and_multiplier_are_monotonic() {
        let t = TierTable::default();
        // Sweep across all band boundaries, including just-below and
        // just-above each threshold.
        let mut amounts = vec![0.001];
        for b in [0.05, 0.20, 0.50, 5.0] {
            amounts.push(b - 1e-9);
            amounts.push(b);
            amounts.push(b + 1e-9);
        }
        amounts.push(100.0);

        let mut prev_r = 0.0;
        let mut prev_m = 0.0;
        for a in amounts {
            let p = t.classify(a);
            assert!(p.retention >= prev_r, "retention regressed at {a}");
            assert!(p.multiplier >= prev_m, "multiplier regressed at {a}");
            prev_r = p.retention;
            prev_m = p.multiplier;
        }
    }

    #[test]
    fn classification_is_idempotent() {
        let t = TierTable::default();
        assert_eq!(t.classify(0.3), t.classify(0.3));
    }
}
