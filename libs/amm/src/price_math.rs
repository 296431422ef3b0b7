//! Constant-product pricing with widened integer intermediates
//!
//! All products are taken in `u128`; every value handed back fits `u64`.

/// Basis-point denominator (10000 bps = 100%)
pub const FEE_SCALING: u64 = 10_000;

/// Reserve ceiling: `reserve * FEE_SCALING` never overflows `u64`
pub const MAX_POOL_VALUE: u64 = u64::MAX / FEE_SCALING;

/// Output amount for selling `input_amount` into a constant-product pool.
///
/// ```text
/// input_with_fee = input_amount * (10000 - fee_bps)
/// output         = input_with_fee * output_reserve
///                  / (input_reserve * 10000 + input_with_fee)
/// ```
///
/// Rounds down. When `input_reserve > 0` the result is strictly below
/// `output_reserve`, since the denominator exceeds `input_with_fee`.
/// Callers guarantee `fee_bps < FEE_SCALING` and a non-zero denominator.
pub fn get_input_price(
    input_amount: u64,
    input_reserve: u64,
    output_reserve: u64,
    fee_bps: u64,
) -> u64 {
    let input_with_fee = input_amount as u128 * (FEE_SCALING - fee_bps) as u128;
    let numerator = input_with_fee * output_reserve as u128;
    let denominator = input_reserve as u128 * FEE_SCALING as u128 + input_with_fee;

    // numerator / denominator <= output_reserve, so the narrowing is lossless
    (numerator / denominator) as u64
}

/// Integer square root: the largest `r` with `r * r <= n`
pub fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }

    // Babylonian iteration from above converges monotonically to floor(sqrt(n))
    let n = n as u128;
    let mut z = n;
    let mut x = n / 2 + 1;
    while x < z {
        z = x;
        x = (n / x + x) / 2;
    }
    z as u64
}

/// `floor(a * b / c)` in `u128`; `None` if `c == 0` or the quotient exceeds `u64`
pub fn widen_mul_div(a: u64, b: u64, c: u64) -> Option<u64> {
    if c == 0 {
        return None;
    }
    let quotient = a as u128 * b as u128 / c as u128;
    u64::try_from(quotient).ok()
}
