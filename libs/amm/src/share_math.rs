//! Liquidity share accounting
//!
//! Mint and burn quantities for deposits and withdrawals. Truncation always
//! rounds in the pool's favor.

use crate::price_math::{isqrt, widen_mul_div};

/// Shares minted for the first deposit into an empty pool.
///
/// Per-asset integer roots multiplied together, not `sqrt(x * y)`; the two
/// differ after truncation and the per-asset form is the one pools use.
pub fn initial_shares(amount_x: u64, amount_y: u64) -> u64 {
    // both roots are below 2^32, so the product fits
    isqrt(amount_x) * isqrt(amount_y)
}

/// Shares minted for a deposit into a pool with outstanding supply.
///
/// The more constraining side wins; any excess on the other side stays in
/// the pool. `None` when the mint does not fit `u64`.
pub fn proportional_shares(
    amount_x: u64,
    amount_y: u64,
    reserve_x: u64,
    reserve_y: u64,
    supply: u64,
) -> Option<u64> {
    let by_x = widen_mul_div(amount_x, supply, reserve_x);
    let by_y = widen_mul_div(amount_y, supply, reserve_y);
    match (by_x, by_y) {
        (Some(x), Some(y)) => Some(x.min(y)),
        // an overflowing side is never the binding one
        (Some(x), None) if reserve_y != 0 => Some(x),
        (None, Some(y)) if reserve_x != 0 => Some(y),
        _ => None,
    }
}

/// Pro-rata withdrawal `(amount_x, amount_y)` for burning `shares`.
///
/// Computed against pre-burn reserves and supply. Requires
/// `0 < shares <= supply`; both amounts are then bounded by their reserve.
pub fn withdrawal_amounts(shares: u64, reserve_x: u64, reserve_y: u64, supply: u64) -> (u64, u64) {
    debug_assert!(
        shares > 0 && shares <= supply,
        "burn of {shares} shares against supply {supply}"
    );
    (
        pro_rata(reserve_x, shares, supply),
        pro_rata(reserve_y, shares, supply),
    )
}

/// `reserve * shares / supply`, which cannot exceed `reserve` when `shares <= supply`
fn pro_rata(reserve: u64, shares: u64, supply: u64) -> u64 {
    (reserve as u128 * shares as u128 / supply as u128) as u64
}
