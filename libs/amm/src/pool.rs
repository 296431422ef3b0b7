//! Constant-product pool state machine
//!
//! A [`Pool`] owns two reserves, a liquidity share supply and an immutable
//! fee. Every mutating operation is split into a plan step, which validates
//! and computes against `&self`, and a commit step that cannot fail. A
//! rejected operation therefore leaves the pool untouched.
//!
//! Invariants held before and after every successful operation:
//! - `reserve_x < MAX_POOL_VALUE` and `reserve_y < MAX_POOL_VALUE`
//! - `share_supply == 0` exactly when both reserves are zero
//! - `reserve_x * reserve_y` never decreases across a swap
//! - `fee_bps < FEE_SCALING`, fixed at creation

use crate::asset::{Asset, Balance, LiquidityShare, PoolId};
use crate::error::{AmmError, AmmResult};
use crate::price_math::{get_input_price, FEE_SCALING, MAX_POOL_VALUE};
use crate::share_math::{initial_shares, proportional_shares, withdrawal_amounts};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Which reserve receives the input of a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Sell X, receive Y
    XToY,
    /// Sell Y, receive X
    YToX,
}

impl SwapDirection {
    pub fn reverse(self) -> Self {
        match self {
            SwapDirection::XToY => SwapDirection::YToX,
            SwapDirection::YToX => SwapDirection::XToY,
        }
    }
}

/// Point-in-time view of a pool, for the hosting environment to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pool_id: PoolId,
    pub asset_x: String,
    pub asset_y: String,
    pub reserve_x: u64,
    pub reserve_y: u64,
    pub share_supply: u64,
    pub fee_bps: u64,
}

/// Liquidity pool pairing assets `X` and `Y`
pub struct Pool<X: Asset, Y: Asset> {
    id: PoolId,
    reserve_x: u64,
    reserve_y: u64,
    share_supply: u64,
    fee_bps: u64,
    _pair: PhantomData<(X, Y)>,
}

impl<X: Asset, Y: Asset> fmt::Debug for Pool<X, Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("pair", &format_args!("{}/{}", X::SYMBOL, Y::SYMBOL))
            .field("reserve_x", &self.reserve_x)
            .field("reserve_y", &self.reserve_y)
            .field("share_supply", &self.share_supply)
            .field("fee_bps", &self.fee_bps)
            .finish()
    }
}

/// Reserves and supply captured before a commit that may need undoing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    reserve_x: u64,
    reserve_y: u64,
    share_supply: u64,
}

fn validate_fee(fee_bps: u64) -> AmmResult<()> {
    if fee_bps >= FEE_SCALING {
        return Err(AmmError::InvalidFee { fee_bps });
    }
    Ok(())
}

/// `reserve + amount`, rejected once it reaches the pool ceiling
fn grown_reserve(reserve: u64, amount: u64) -> AmmResult<u64> {
    reserve
        .checked_add(amount)
        .filter(|grown| *grown < MAX_POOL_VALUE)
        .ok_or(AmmError::PoolOverflow)
}

impl<X: Asset, Y: Asset> Pool<X, Y> {
    /// Create an empty pool; the first `add_liquidity` seeds it
    pub fn new(id: PoolId, fee_bps: u64) -> AmmResult<Self> {
        validate_fee(fee_bps)?;
        debug!(pool = %id, fee_bps, "Created empty {}/{} pool", X::SYMBOL, Y::SYMBOL);
        Ok(Self {
            id,
            reserve_x: 0,
            reserve_y: 0,
            share_supply: 0,
            fee_bps,
            _pair: PhantomData,
        })
    }

    /// Create a pool seeded with both assets, minting the initial shares
    pub fn create_seeded(
        id: PoolId,
        fee_bps: u64,
        x: Balance<X>,
        y: Balance<Y>,
    ) -> AmmResult<(Self, LiquidityShare<X, Y>)> {
        let (amount_x, amount_y) = (x.value(), y.value());
        let minted = Self::preview_seed(fee_bps, amount_x, amount_y)?;
        let pool = Self {
            id,
            reserve_x: x.into_value(),
            reserve_y: y.into_value(),
            share_supply: minted,
            fee_bps,
            _pair: PhantomData,
        };

        debug!(
            pool = %id,
            fee_bps,
            amount_x,
            amount_y,
            minted,
            "Created seeded {}/{} pool",
            X::SYMBOL,
            Y::SYMBOL
        );
        Ok((pool, LiquidityShare::new(id, minted)))
    }

    /// Validate a seeded creation without building it; returns the initial mint
    pub fn preview_seed(fee_bps: u64, amount_x: u64, amount_y: u64) -> AmmResult<u64> {
        validate_fee(fee_bps)?;
        if amount_x == 0 || amount_y == 0 {
            return Err(AmmError::ZeroAmount);
        }
        if amount_x >= MAX_POOL_VALUE || amount_y >= MAX_POOL_VALUE {
            return Err(AmmError::PoolOverflow);
        }
        Ok(initial_shares(amount_x, amount_y))
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn fee_bps(&self) -> u64 {
        self.fee_bps
    }

    /// `(reserve_x, reserve_y, share_supply)`
    pub fn reserves(&self) -> (u64, u64, u64) {
        (self.reserve_x, self.reserve_y, self.share_supply)
    }

    pub fn is_empty(&self) -> bool {
        self.share_supply == 0
    }

    /// Marginal price of X in units of Y, `None` for an empty pool
    pub fn spot_price(&self) -> Option<Decimal> {
        if self.reserve_x == 0 || self.reserve_y == 0 {
            return None;
        }
        Decimal::from(self.reserve_y).checked_div(Decimal::from(self.reserve_x))
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            pool_id: self.id,
            asset_x: X::SYMBOL.to_string(),
            asset_y: Y::SYMBOL.to_string(),
            reserve_x: self.reserve_x,
            reserve_y: self.reserve_y,
            share_supply: self.share_supply,
            fee_bps: self.fee_bps,
        }
    }

    /// Output a swap of `amount` X would receive right now
    pub fn quote_x_to_y(&self, amount: u64) -> AmmResult<u64> {
        self.plan_swap(SwapDirection::XToY, amount)
    }

    /// Output a swap of `amount` Y would receive right now
    pub fn quote_y_to_x(&self, amount: u64) -> AmmResult<u64> {
        self.plan_swap(SwapDirection::YToX, amount)
    }

    /// Direction-generic quote; identical to what the swap would pay out
    pub fn quote(&self, direction: SwapDirection, amount: u64) -> AmmResult<u64> {
        self.plan_swap(direction, amount)
    }

    /// Shares a deposit of `(amount_x, amount_y)` would mint right now
    pub fn preview_add_liquidity(&self, amount_x: u64, amount_y: u64) -> AmmResult<u64> {
        self.plan_add(amount_x, amount_y)
    }

    /// Assets burning `shares` would return right now
    pub fn preview_remove_liquidity(&self, shares: u64) -> AmmResult<(u64, u64)> {
        self.plan_remove(shares)
    }

    /// Sell X for Y
    pub fn swap_x_for_y(&mut self, input: Balance<X>) -> AmmResult<Balance<Y>> {
        let output = self.swap(SwapDirection::XToY, input.value())?;
        Ok(Balance::new(output))
    }

    /// Sell Y for X
    pub fn swap_y_for_x(&mut self, input: Balance<Y>) -> AmmResult<Balance<X>> {
        let output = self.swap(SwapDirection::YToX, input.value())?;
        Ok(Balance::new(output))
    }

    /// Deposit both assets and mint shares against them.
    ///
    /// An imbalanced deposit mints by the scarcer side; the surplus is not
    /// refunded and accrues to all share holders.
    pub fn add_liquidity(
        &mut self,
        x: Balance<X>,
        y: Balance<Y>,
    ) -> AmmResult<LiquidityShare<X, Y>> {
        let (amount_x, amount_y) = (x.value(), y.value());
        let minted = self.plan_add(amount_x, amount_y)?;

        self.reserve_x += amount_x;
        self.reserve_y += amount_y;
        self.share_supply += minted;

        debug!(
            pool = %self.id,
            amount_x,
            amount_y,
            minted,
            reserve_x = self.reserve_x,
            reserve_y = self.reserve_y,
            share_supply = self.share_supply,
            "Liquidity added"
        );
        Ok(LiquidityShare::new(self.id, minted))
    }

    /// Burn shares for a pro-rata slice of both reserves
    pub fn remove_liquidity(
        &mut self,
        shares: LiquidityShare<X, Y>,
    ) -> AmmResult<(Balance<X>, Balance<Y>)> {
        if shares.pool_id() != self.id {
            return Err(AmmError::PoolMismatch {
                expected: self.id,
                actual: shares.pool_id(),
            });
        }
        let burned = shares.value();
        let (amount_x, amount_y) = self.plan_remove(burned)?;

        self.share_supply -= burned;
        self.reserve_x -= amount_x;
        self.reserve_y -= amount_y;

        debug!(
            pool = %self.id,
            burned,
            amount_x,
            amount_y,
            reserve_x = self.reserve_x,
            reserve_y = self.reserve_y,
            share_supply = self.share_supply,
            "Liquidity removed"
        );
        Ok((Balance::new(amount_x), Balance::new(amount_y)))
    }

    /// Shared swap path for both directions; returns the output amount
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            reserve_x: self.reserve_x,
            reserve_y: self.reserve_y,
            share_supply: self.share_supply,
        }
    }

    /// Undo every commit made since `checkpoint` was taken
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.reserve_x = checkpoint.reserve_x;
        self.reserve_y = checkpoint.reserve_y;
        self.share_supply = checkpoint.share_supply;
        debug!(pool = %self.id, ?checkpoint, "Restored pool checkpoint");
    }

    pub(crate) fn swap(&mut self, direction: SwapDirection, amount_in: u64) -> AmmResult<u64> {
        let amount_out = self.plan_swap(direction, amount_in)?;

        // plan_swap bounds the grown input reserve and amount_out < output reserve
        match direction {
            SwapDirection::XToY => {
                self.reserve_x += amount_in;
                self.reserve_y -= amount_out;
            }
            SwapDirection::YToX => {
                self.reserve_y += amount_in;
                self.reserve_x -= amount_out;
            }
        }

        debug!(
            pool = %self.id,
            ?direction,
            amount_in,
            amount_out,
            reserve_x = self.reserve_x,
            reserve_y = self.reserve_y,
            "Swap executed"
        );
        Ok(amount_out)
    }

    /// `(input_reserve, output_reserve)` for a direction
    fn oriented(&self, direction: SwapDirection) -> (u64, u64) {
        match direction {
            SwapDirection::XToY => (self.reserve_x, self.reserve_y),
            SwapDirection::YToX => (self.reserve_y, self.reserve_x),
        }
    }

    fn plan_swap(&self, direction: SwapDirection, amount_in: u64) -> AmmResult<u64> {
        if amount_in == 0 {
            return Err(AmmError::ZeroAmount);
        }
        if self.reserve_x == 0 || self.reserve_y == 0 {
            return Err(AmmError::EmptyReserves);
        }

        let (input_reserve, output_reserve) = self.oriented(direction);
        grown_reserve(input_reserve, amount_in)?;

        Ok(get_input_price(
            amount_in,
            input_reserve,
            output_reserve,
            self.fee_bps,
        ))
    }

    fn plan_add(&self, amount_x: u64, amount_y: u64) -> AmmResult<u64> {
        if amount_x == 0 || amount_y == 0 {
            return Err(AmmError::ZeroAmount);
        }
        grown_reserve(self.reserve_x, amount_x)?;
        grown_reserve(self.reserve_y, amount_y)?;

        let minted = if self.share_supply == 0 {
            initial_shares(amount_x, amount_y)
        } else {
            proportional_shares(
                amount_x,
                amount_y,
                self.reserve_x,
                self.reserve_y,
                self.share_supply,
            )
            .ok_or(AmmError::PoolOverflow)?
        };

        self.share_supply
            .checked_add(minted)
            .ok_or(AmmError::PoolOverflow)?;
        Ok(minted)
    }

    fn plan_remove(&self, shares: u64) -> AmmResult<(u64, u64)> {
        if shares == 0 {
            return Err(AmmError::ZeroAmount);
        }
        if shares > self.share_supply {
            return Err(AmmError::InsufficientShares {
                requested: shares,
                supply: self.share_supply,
            });
        }
        Ok(withdrawal_amounts(
            shares,
            self.reserve_x,
            self.reserve_y,
            self.share_supply,
        ))
    }
}
