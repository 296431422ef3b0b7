//! Pool Registry
//!
//! Independently addressable pools behind one concurrent map. Each entry is
//! a [`PoolHandle`] with its own lock; the registry itself never serializes
//! operations across pools.

use crate::asset::{Asset, Balance, LiquidityShare, PoolId};
use crate::error::{AmmError, AmmResult};
use crate::handle::{refund_pair, PoolHandle};
use crate::pool::{Pool, PoolSnapshot};
use crate::pool_traits::{AmmPool, RegisteredPool};
use crate::vault::{AccountId, AssetVault};
use cpamm_config::EngineConfig;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Static metadata of a registered pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub pool_id: PoolId,
    pub asset_x: String,
    pub asset_y: String,
    pub fee_bps: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_pools: usize,
    pub seeded_pools: usize,
    pub empty_pools: usize,
}

struct Entry {
    info: PoolInfo,
    pool: Arc<dyn RegisteredPool>,
}

/// Registry of all pools hosted by this engine
pub struct PoolRegistry {
    pools: DashMap<PoolId, Entry>,
    next_id: AtomicU64,
    config: EngineConfig,
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl PoolRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            pools: DashMap::new(),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create and register an empty pool
    pub fn create_pool<X: Asset, Y: Asset>(&self, fee_bps: u64) -> AmmResult<PoolHandle<X, Y>> {
        let pool = Pool::<X, Y>::new(self.allocate_id(), fee_bps)?;
        Ok(self.register(pool))
    }

    /// Create an empty pool at the configured default fee
    pub fn create_pool_with_default_fee<X: Asset, Y: Asset>(&self) -> AmmResult<PoolHandle<X, Y>> {
        self.create_pool(self.config.engine.default_fee_bps)
    }

    /// Create and register a pool seeded with both assets
    pub fn create_seeded_pool<X: Asset, Y: Asset>(
        &self,
        fee_bps: u64,
        x: Balance<X>,
        y: Balance<Y>,
    ) -> AmmResult<(PoolHandle<X, Y>, LiquidityShare<X, Y>)> {
        let (pool, shares) = Pool::create_seeded(self.allocate_id(), fee_bps, x, y)?;
        Ok((self.register(pool), shares))
    }

    /// Seed a new pool from the caller's holdings; initial shares go to the caller
    pub fn create_seeded_pool_for<X: Asset, Y: Asset, V: AssetVault>(
        &self,
        vault: &V,
        caller: &AccountId,
        fee_bps: u64,
        amount_x: u64,
        amount_y: u64,
    ) -> AmmResult<PoolHandle<X, Y>> {
        let minted = Pool::<X, Y>::preview_seed(fee_bps, amount_x, amount_y)?;
        let pool_id = self.allocate_id();
        vault.can_deposit_shares(caller, pool_id, minted)?;

        let x = vault.withdraw::<X>(caller, amount_x)?;
        let y = match vault.withdraw::<Y>(caller, amount_y) {
            Ok(y) => y,
            Err(error) => {
                vault.deposit(caller, x)?;
                return Err(error.into());
            }
        };

        // registered only once the caller holds the initial shares
        let (pool, shares) = match Pool::create_seeded(pool_id, fee_bps, x, y) {
            Ok(seeded) => seeded,
            Err(error) => {
                refund_pair::<X, Y, V>(vault, caller, amount_x, amount_y)?;
                return Err(error);
            }
        };
        if let Err(error) = vault.deposit_shares(caller, shares) {
            refund_pair::<X, Y, V>(vault, caller, amount_x, amount_y)?;
            return Err(error.into());
        }

        debug!(pool = %pool_id, %caller, minted, "Seeded pool for caller");
        Ok(self.register(pool))
    }

    /// Typed handle for a registered pool
    pub fn get<X: Asset, Y: Asset>(&self, pool_id: PoolId) -> AmmResult<PoolHandle<X, Y>> {
        let entry = self
            .pools
            .get(&pool_id)
            .ok_or(AmmError::PoolNotFound(pool_id))?;
        let handle = entry
            .pool
            .as_any()
            .downcast_ref::<PoolHandle<X, Y>>()
            .cloned();
        handle.ok_or(AmmError::AssetMismatch { pool_id })
    }

    pub fn info(&self, pool_id: PoolId) -> AmmResult<PoolInfo> {
        self.pools
            .get(&pool_id)
            .map(|entry| entry.info.clone())
            .ok_or(AmmError::PoolNotFound(pool_id))
    }

    pub fn snapshot(&self, pool_id: PoolId) -> AmmResult<PoolSnapshot> {
        let pool = self.erased(pool_id)?;
        Ok(pool.get_snapshot())
    }

    /// Snapshots of every pool, ordered by id
    pub fn snapshots(&self) -> Vec<PoolSnapshot> {
        self.pool_ids()
            .into_iter()
            .filter_map(|id| self.snapshot(id).ok())
            .collect()
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        let mut ids: Vec<PoolId> = self.pools.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let snapshots = self.snapshots();
        let seeded_pools = snapshots.iter().filter(|s| s.share_supply > 0).count();
        RegistryStats {
            total_pools: snapshots.len(),
            seeded_pools,
            empty_pools: snapshots.len() - seeded_pools,
        }
    }

    fn allocate_id(&self) -> PoolId {
        PoolId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Clone the erased pool out so no map shard stays locked during pool work
    fn erased(&self, pool_id: PoolId) -> AmmResult<Arc<dyn RegisteredPool>> {
        self.pools
            .get(&pool_id)
            .map(|entry| Arc::clone(&entry.pool))
            .ok_or(AmmError::PoolNotFound(pool_id))
    }

    fn register<X: Asset, Y: Asset>(&self, pool: Pool<X, Y>) -> PoolHandle<X, Y> {
        let info = PoolInfo {
            pool_id: pool.id(),
            asset_x: X::SYMBOL.to_string(),
            asset_y: Y::SYMBOL.to_string(),
            fee_bps: pool.fee_bps(),
        };
        let handle = PoolHandle::new(pool);

        info!(
            pool = %info.pool_id,
            pair = %format!("{}/{}", info.asset_x, info.asset_y),
            fee_bps = info.fee_bps,
            "Registered pool"
        );
        self.pools.insert(
            info.pool_id,
            Entry {
                info,
                pool: Arc::new(handle.clone()),
            },
        );
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::test_assets::{Dai, Usdc, Weth};
    use crate::error::VaultError;
    use crate::vault::test_vaults::RefusingVault;
    use crate::vault::InMemoryVault;

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let registry = PoolRegistry::default();
        let a = registry.create_pool::<Usdc, Weth>(30).unwrap();
        let b = registry.create_pool::<Usdc, Weth>(5).unwrap();
        let c = registry.create_pool::<Dai, Usdc>(1).unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(registry.pool_ids(), vec![a.id(), b.id(), c.id()]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_invalid_fee_registers_nothing() {
        let registry = PoolRegistry::default();
        assert_eq!(
            registry.create_pool::<Usdc, Weth>(10_000).unwrap_err(),
            AmmError::InvalidFee { fee_bps: 10_000 }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_fee_from_config() {
        let mut config = EngineConfig::default();
        config.engine.default_fee_bps = 5;
        let registry = PoolRegistry::new(config);

        let handle = registry.create_pool_with_default_fee::<Usdc, Weth>().unwrap();
        assert_eq!(handle.fee_bps(), 5);
        assert_eq!(registry.info(handle.id()).unwrap().fee_bps, 5);
    }

    #[test]
    fn test_get_checks_asset_identity() {
        let registry = PoolRegistry::default();
        let handle = registry.create_pool::<Usdc, Weth>(30).unwrap();

        let fetched = registry.get::<Usdc, Weth>(handle.id()).unwrap();
        assert_eq!(fetched.id(), handle.id());

        assert_eq!(
            registry.get::<Weth, Usdc>(handle.id()).unwrap_err(),
            AmmError::AssetMismatch {
                pool_id: handle.id()
            }
        );
        assert_eq!(
            registry.get::<Usdc, Weth>(PoolId(99)).unwrap_err(),
            AmmError::PoolNotFound(PoolId(99))
        );
    }

    #[test]
    fn test_fetched_handle_shares_state() {
        let registry = PoolRegistry::default();
        let (handle, shares) = registry
            .create_seeded_pool::<Usdc, Weth>(30, Balance::new(1000), Balance::new(1000))
            .unwrap();
        assert_eq!(shares.value(), 961);

        let fetched = registry.get::<Usdc, Weth>(handle.id()).unwrap();
        fetched.swap_x_for_y(Balance::new(100)).unwrap();

        assert_eq!(handle.reserves(), (1100, 910, 961));
        let snapshot = registry.snapshot(handle.id()).unwrap();
        assert_eq!((snapshot.reserve_x, snapshot.reserve_y), (1100, 910));
    }

    #[test]
    fn test_seeded_for_caller() {
        let registry = PoolRegistry::default();
        let vault = InMemoryVault::new();
        let lp = AccountId::new("lp");
        vault.credit::<Usdc>(&lp, 2_000).unwrap();
        vault.credit::<Weth>(&lp, 1_000).unwrap();

        let handle = registry
            .create_seeded_pool_for::<Usdc, Weth, _>(&vault, &lp, 30, 1_000, 1_000)
            .unwrap();
        assert_eq!(vault.shares_of(&lp, handle.id()), 961);
        assert_eq!(vault.balance_of::<Usdc>(&lp), 1_000);
        assert_eq!(vault.balance_of::<Weth>(&lp), 0);
    }

    #[test]
    fn test_seeded_for_caller_rejects_before_custody() {
        let registry = PoolRegistry::default();
        let vault = InMemoryVault::new();
        let lp = AccountId::new("lp");
        vault.credit::<Usdc>(&lp, 1_000).unwrap();
        vault.credit::<Weth>(&lp, 500).unwrap();

        let zero = registry
            .create_seeded_pool_for::<Usdc, Weth, _>(&vault, &lp, 30, 1_000, 0)
            .unwrap_err();
        assert_eq!(zero, AmmError::ZeroAmount);

        let short = registry
            .create_seeded_pool_for::<Usdc, Weth, _>(&vault, &lp, 30, 1_000, 1_000)
            .unwrap_err();
        assert!(matches!(
            short,
            AmmError::Vault(VaultError::InsufficientBalance { asset: "WETH", .. })
        ));

        assert_eq!(vault.balance_of::<Usdc>(&lp), 1_000);
        assert_eq!(vault.balance_of::<Weth>(&lp), 500);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_seeded_for_caller_unregistered_when_share_credit_fails() {
        let registry = PoolRegistry::default();
        let vault = RefusingVault::new("LSP");
        let lp = AccountId::new("lp");
        vault.inner.credit::<Usdc>(&lp, 1_000).unwrap();
        vault.inner.credit::<Weth>(&lp, 1_000).unwrap();

        assert!(registry
            .create_seeded_pool_for::<Usdc, Weth, _>(&vault, &lp, 30, 1_000, 1_000)
            .is_err());
        assert!(registry.is_empty());
        assert_eq!(vault.balance_of::<Usdc>(&lp), 1_000);
        assert_eq!(vault.balance_of::<Weth>(&lp), 1_000);
    }

    #[test]
    fn test_stats_and_snapshots() {
        let registry = PoolRegistry::default();
        registry.create_pool::<Usdc, Weth>(30).unwrap();
        registry
            .create_seeded_pool::<Dai, Weth>(30, Balance::new(10), Balance::new(10))
            .unwrap();

        assert_eq!(
            registry.stats(),
            RegistryStats {
                total_pools: 2,
                seeded_pools: 1,
                empty_pools: 1,
            }
        );

        let snapshots = registry.snapshots();
        assert_eq!(snapshots[0].asset_x, "USDC");
        assert_eq!(snapshots[1].asset_x, "DAI");
        assert_eq!(snapshots[1].share_supply, 9);
    }
}
