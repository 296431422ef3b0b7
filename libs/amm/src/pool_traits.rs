//! Pool trait definitions for a unified, asset-erased interface

use crate::asset::{Asset, PoolId};
use crate::error::AmmResult;
use crate::handle::PoolHandle;
use crate::pool::{Pool, PoolSnapshot, SwapDirection};
use std::any::Any;

/// Read-only view shared by every pool regardless of its asset pair
pub trait AmmPool {
    fn pool_id(&self) -> PoolId;

    /// Output for selling `amount_in` in `direction`
    fn get_amount_out(&self, direction: SwapDirection, amount_in: u64) -> AmmResult<u64>;

    /// `(reserve_x, reserve_y, share_supply)`
    fn get_liquidity(&self) -> (u64, u64, u64);

    fn get_fee_bps(&self) -> u64;

    fn get_snapshot(&self) -> PoolSnapshot;
}

/// A pool the registry can store without knowing its asset pair
pub trait RegisteredPool: AmmPool + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<X: Asset, Y: Asset> AmmPool for Pool<X, Y> {
    fn pool_id(&self) -> PoolId {
        self.id()
    }

    fn get_amount_out(&self, direction: SwapDirection, amount_in: u64) -> AmmResult<u64> {
        self.quote(direction, amount_in)
    }

    fn get_liquidity(&self) -> (u64, u64, u64) {
        self.reserves()
    }

    fn get_fee_bps(&self) -> u64 {
        self.fee_bps()
    }

    fn get_snapshot(&self) -> PoolSnapshot {
        self.snapshot()
    }
}

impl<X: Asset, Y: Asset> AmmPool for PoolHandle<X, Y> {
    fn pool_id(&self) -> PoolId {
        self.id()
    }

    fn get_amount_out(&self, direction: SwapDirection, amount_in: u64) -> AmmResult<u64> {
        self.with_pool(|pool| pool.quote(direction, amount_in))
    }

    fn get_liquidity(&self) -> (u64, u64, u64) {
        self.reserves()
    }

    fn get_fee_bps(&self) -> u64 {
        self.fee_bps()
    }

    fn get_snapshot(&self) -> PoolSnapshot {
        self.snapshot()
    }
}

impl<X: Asset, Y: Asset> RegisteredPool for PoolHandle<X, Y> {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
