//! Typed asset quantities and pool-scoped liquidity shares
//!
//! Asset kinds are zero-sized marker types implementing [`Asset`]. A
//! [`Balance`] carries a quantity tagged with its asset at compile time, and a
//! [`LiquidityShare`] additionally carries the id of the pool that issued it.

use crate::error::{AmmError, AmmResult, VaultError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for a fungible asset kind
pub trait Asset: 'static + Send + Sync {
    /// Ticker used in logs, errors and pool metadata
    const SYMBOL: &'static str;
}

/// Pool identity allocated by the hosting environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(pub u64);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A quantity of asset `A` that has left external custody
pub struct Balance<A: Asset> {
    value: u64,
    _asset: PhantomData<A>,
}

impl<A: Asset> Balance<A> {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            _asset: PhantomData,
        }
    }

    pub fn zero() -> Self {
        Self::new(0)
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Take `amount` out of this balance into a new one
    pub fn split(&mut self, amount: u64) -> Result<Self, VaultError> {
        if amount > self.value {
            return Err(VaultError::SplitExceedsBalance {
                asset: A::SYMBOL,
                requested: amount,
                available: self.value,
            });
        }
        self.value -= amount;
        Ok(Self::new(amount))
    }

    /// Merge `other` into this balance, returning the new value
    pub fn join(&mut self, other: Self) -> Result<u64, VaultError> {
        self.value = self
            .value
            .checked_add(other.value)
            .ok_or(VaultError::BalanceOverflow { asset: A::SYMBOL })?;
        Ok(self.value)
    }

    pub(crate) fn into_value(self) -> u64 {
        self.value
    }
}

impl<A: Asset> fmt::Debug for Balance<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Balance<{}>({})", A::SYMBOL, self.value)
    }
}

impl<A: Asset> PartialEq for Balance<A> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<A: Asset> Eq for Balance<A> {}

/// Liquidity shares issued by one `Pool<X, Y>`
pub struct LiquidityShare<X: Asset, Y: Asset> {
    pool_id: PoolId,
    value: u64,
    _pair: PhantomData<(X, Y)>,
}

impl<X: Asset, Y: Asset> LiquidityShare<X, Y> {
    /// Wrap a custodied share quantity; vault implementations use this to
    /// hand shares back to the pool that issued them.
    pub fn new(pool_id: PoolId, value: u64) -> Self {
        Self {
            pool_id,
            value,
            _pair: PhantomData,
        }
    }

    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn split(&mut self, amount: u64) -> AmmResult<Self> {
        if amount > self.value {
            return Err(AmmError::InsufficientShares {
                requested: amount,
                supply: self.value,
            });
        }
        self.value -= amount;
        Ok(Self::new(self.pool_id, amount))
    }

    /// Merge shares of the same pool
    pub fn join(&mut self, other: Self) -> AmmResult<u64> {
        if other.pool_id != self.pool_id {
            return Err(AmmError::PoolMismatch {
                expected: self.pool_id,
                actual: other.pool_id,
            });
        }
        self.value = self
            .value
            .checked_add(other.value)
            .ok_or(AmmError::PoolOverflow)?;
        Ok(self.value)
    }
}

impl<X: Asset, Y: Asset> fmt::Debug for LiquidityShare<X, Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LiquidityShare<{}/{}>({} @ {})",
            X::SYMBOL,
            Y::SYMBOL,
            self.value,
            self.pool_id
        )
    }
}

impl<X: Asset, Y: Asset> PartialEq for LiquidityShare<X, Y> {
    fn eq(&self, other: &Self) -> bool {
        self.pool_id == other.pool_id && self.value == other.value
    }
}

impl<X: Asset, Y: Asset> Eq for LiquidityShare<X, Y> {}
