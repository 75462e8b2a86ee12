//! Pure payout arithmetic for winner announcement.
//!
//! Kept free of state so the conservation properties are directly
//! testable: prize payouts never exceed the prize pool, voter shares
//! never exceed the voter pool.

/// Fixed prize weights by rank (top five entrants).
pub const RANK_WEIGHTS: [f64; 5] = [0.40, 0.25, 0.20, 0.10, 0.05];

/// Compute the ranked prize payouts.
///
/// `multipliers` holds the tier multiplier of each ranked winner, best
/// rank first; at most `RANK_WEIGHTS.len()` entries are paid. Each payout
/// is `floor(prize_pool * weight * multiplier)`, clamped to the prize
/// funds still remaining so the total never exceeds `prize_pool` even
/// with large multipliers.
pub fn prize_payouts(prize_pool: u64, multipliers: &[f64]) -> Vec<u64> {
    let mut remaining = prize_pool;
    multipliers
        .iter()
        .take(RANK_WEIGHTS.len())
        .zip(RANK_WEIGHTS.iter())
        .map(|(multiplier, weight)| {
            let raw = (prize_pool as f64 * weight * multiplier).floor() as u64;
            let paid = raw.min(remaining);
            remaining -= paid;
            paid
        })
        .collect()
}

/// Split the voter pool pro-rata by contribution amount.
///
/// `amounts` holds each eligible voter's original contribution. Shares
/// are floored; zero shares are kept in place (the caller skips them) so
/// indices stay aligned with the input.
pub fn voter_shares(voter_pool: u64, amounts: &[f64]) -> Vec<u64> {
    let total: f64 = amounts.iter().sum();
    if total <= 0.0 {
        return vec![0; amounts.len()];
    }
    amounts
        .iter()
        .map(|a| (a / total * voter_pool as f64).floor() as u64)
        .collect()
}
