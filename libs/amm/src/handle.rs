//! Shared, lock-guarded access to a single pool
//!
//! A [`PoolHandle`] is a cheap clone of `Arc<Mutex<Pool>>`. Each operation
//! takes the pool lock once and runs its whole read-compute-write sequence
//! under it, so exactly one operation commits against a given pool at a
//! time while different pools proceed independently.
//!
//! The `*_for` operations route assets through an [`AssetVault`] on behalf
//! of a caller. They validate against the locked pool, including whether
//! the vault will accept every credit, before withdrawing anything. If a
//! credit still fails after the pool commits, the pool is restored to its
//! checkpoint and the caller's inputs are returned. A rejected operation
//! therefore never takes custody of the caller's assets.

use crate::asset::{Asset, Balance, LiquidityShare, PoolId};
use crate::error::AmmResult;
use crate::pool::{Pool, PoolSnapshot, SwapDirection};
use crate::vault::{AccountId, AssetVault};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct PoolHandle<X: Asset, Y: Asset> {
    id: PoolId,
    pool: Arc<Mutex<Pool<X, Y>>>,
}

impl<X: Asset, Y: Asset> Clone for PoolHandle<X, Y> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<X: Asset, Y: Asset> std::fmt::Debug for PoolHandle<X, Y> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("PoolHandle");
        debug.field("id", &self.id);
        match self.pool.try_lock() {
            Some(pool) => debug.field("pool", &*pool),
            None => debug.field("pool", &format_args!("<locked>")),
        };
        debug.finish()
    }
}

/// Log a rejected operation at the handle boundary and pass the result on
fn logged<T>(id: PoolId, operation: &'static str, result: AmmResult<T>) -> AmmResult<T> {
    if let Err(ref error) = result {
        warn!(pool = %id, operation, %error, "Operation rejected");
    }
    result
}

impl<X: Asset, Y: Asset> PoolHandle<X, Y> {
    pub fn new(pool: Pool<X, Y>) -> Self {
        Self {
            id: pool.id(),
            pool: Arc::new(Mutex::new(pool)),
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Run `f` against the locked pool without mutating it
    pub fn with_pool<R>(&self, f: impl FnOnce(&Pool<X, Y>) -> R) -> R {
        f(&self.pool.lock())
    }

    pub fn reserves(&self) -> (u64, u64, u64) {
        self.pool.lock().reserves()
    }

    pub fn fee_bps(&self) -> u64 {
        self.pool.lock().fee_bps()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.pool.lock().snapshot()
    }

    pub fn quote_x_to_y(&self, amount: u64) -> AmmResult<u64> {
        self.pool.lock().quote_x_to_y(amount)
    }

    pub fn quote_y_to_x(&self, amount: u64) -> AmmResult<u64> {
        self.pool.lock().quote_y_to_x(amount)
    }

    pub fn swap_x_for_y(&self, input: Balance<X>) -> AmmResult<Balance<Y>> {
        logged(self.id, "swap_x_for_y", self.pool.lock().swap_x_for_y(input))
    }

    pub fn swap_y_for_x(&self, input: Balance<Y>) -> AmmResult<Balance<X>> {
        logged(self.id, "swap_y_for_x", self.pool.lock().swap_y_for_x(input))
    }

    pub fn add_liquidity(&self, x: Balance<X>, y: Balance<Y>) -> AmmResult<LiquidityShare<X, Y>> {
        logged(self.id, "add_liquidity", self.pool.lock().add_liquidity(x, y))
    }

    pub fn remove_liquidity(
        &self,
        shares: LiquidityShare<X, Y>,
    ) -> AmmResult<(Balance<X>, Balance<Y>)> {
        logged(
            self.id,
            "remove_liquidity",
            self.pool.lock().remove_liquidity(shares),
        )
    }

    /// Sell `amount_in` of the caller's X; the Y output is credited to the caller
    pub fn swap_x_for_y_for<V: AssetVault>(
        &self,
        vault: &V,
        caller: &AccountId,
        amount_in: u64,
    ) -> AmmResult<u64> {
        logged(
            self.id,
            "swap_x_for_y",
            self.routed_swap(vault, caller, SwapDirection::XToY, amount_in),
        )
    }

    /// Sell `amount_in` of the caller's Y; the X output is credited to the caller
    pub fn swap_y_for_x_for<V: AssetVault>(
        &self,
        vault: &V,
        caller: &AccountId,
        amount_in: u64,
    ) -> AmmResult<u64> {
        logged(
            self.id,
            "swap_y_for_x",
            self.routed_swap(vault, caller, SwapDirection::YToX, amount_in),
        )
    }

    /// Deposit from the caller's holdings; minted shares are credited to the caller
    pub fn add_liquidity_for<V: AssetVault>(
        &self,
        vault: &V,
        caller: &AccountId,
        amount_x: u64,
        amount_y: u64,
    ) -> AmmResult<u64> {
        logged(
            self.id,
            "add_liquidity",
            self.routed_add(vault, caller, amount_x, amount_y),
        )
    }

    /// Burn the caller's shares; both withdrawn assets are credited to the caller
    pub fn remove_liquidity_for<V: AssetVault>(
        &self,
        vault: &V,
        caller: &AccountId,
        shares: u64,
    ) -> AmmResult<(u64, u64)> {
        logged(
            self.id,
            "remove_liquidity",
            self.routed_remove(vault, caller, shares),
        )
    }

    fn routed_add<V: AssetVault>(
        &self,
        vault: &V,
        caller: &AccountId,
        amount_x: u64,
        amount_y: u64,
    ) -> AmmResult<u64> {
        let mut pool = self.pool.lock();
        let minted = pool.preview_add_liquidity(amount_x, amount_y)?;
        vault.can_deposit_shares(caller, self.id, minted)?;

        let x = vault.withdraw::<X>(caller, amount_x)?;
        let y = match vault.withdraw::<Y>(caller, amount_y) {
            Ok(y) => y,
            Err(error) => {
                vault.deposit(caller, x)?;
                return Err(error.into());
            }
        };

        let checkpoint = pool.checkpoint();
        let shares = match pool.add_liquidity(x, y) {
            Ok(shares) => shares,
            Err(error) => {
                refund_pair::<X, Y, V>(vault, caller, amount_x, amount_y)?;
                return Err(error);
            }
        };
        if let Err(error) = vault.deposit_shares(caller, shares) {
            pool.restore(checkpoint);
            refund_pair::<X, Y, V>(vault, caller, amount_x, amount_y)?;
            return Err(error.into());
        }

        debug!(pool = %self.id, %caller, minted, "Liquidity added for caller");
        Ok(minted)
    }

    fn routed_remove<V: AssetVault>(
        &self,
        vault: &V,
        caller: &AccountId,
        shares: u64,
    ) -> AmmResult<(u64, u64)> {
        let mut pool = self.pool.lock();
        let (amount_x, amount_y) = pool.preview_remove_liquidity(shares)?;
        vault.can_deposit::<X>(caller, amount_x)?;
        vault.can_deposit::<Y>(caller, amount_y)?;

        let burned = vault.withdraw_shares::<X, Y>(caller, self.id, shares)?;
        let checkpoint = pool.checkpoint();
        let (x, y) = match pool.remove_liquidity(burned) {
            Ok(withdrawn) => withdrawn,
            Err(error) => {
                vault.deposit_shares(caller, LiquidityShare::<X, Y>::new(self.id, shares))?;
                return Err(error);
            }
        };

        if let Err(error) = vault.deposit(caller, x) {
            pool.restore(checkpoint);
            vault.deposit_shares(caller, LiquidityShare::<X, Y>::new(self.id, shares))?;
            return Err(error.into());
        }
        if let Err(error) = vault.deposit(caller, y) {
            // take the credited X leg back before reinstating the burn
            vault.withdraw::<X>(caller, amount_x)?;
            pool.restore(checkpoint);
            vault.deposit_shares(caller, LiquidityShare::<X, Y>::new(self.id, shares))?;
            return Err(error.into());
        }

        debug!(
            pool = %self.id,
            %caller,
            shares,
            amount_x,
            amount_y,
            "Liquidity removed for caller"
        );
        Ok((amount_x, amount_y))
    }

    fn routed_swap<V: AssetVault>(
        &self,
        vault: &V,
        caller: &AccountId,
        direction: SwapDirection,
        amount_in: u64,
    ) -> AmmResult<u64> {
        let mut pool = self.pool.lock();
        let amount_out = pool.quote(direction, amount_in)?;

        match direction {
            SwapDirection::XToY => settle_swap(
                &mut *pool,
                vault,
                caller,
                amount_in,
                amount_out,
                Pool::swap_x_for_y,
            )?,
            SwapDirection::YToX => settle_swap(
                &mut *pool,
                vault,
                caller,
                amount_in,
                amount_out,
                Pool::swap_y_for_x,
            )?,
        }

        debug!(pool = %self.id, %caller, ?direction, amount_in, amount_out, "Swap routed to caller");
        Ok(amount_out)
    }
}

/// Return both deposit legs to the caller after an undone deposit
pub(crate) fn refund_pair<X: Asset, Y: Asset, V: AssetVault>(
    vault: &V,
    caller: &AccountId,
    amount_x: u64,
    amount_y: u64,
) -> AmmResult<()> {
    vault.deposit(caller, Balance::<X>::new(amount_x))?;
    vault.deposit(caller, Balance::<Y>::new(amount_y))?;
    Ok(())
}

/// Withdraw `I`, run `execute`, credit the `O` output; the pool is restored
/// and the input refunded when the credit fails
fn settle_swap<X, Y, I, O, V, F>(
    pool: &mut Pool<X, Y>,
    vault: &V,
    caller: &AccountId,
    amount_in: u64,
    amount_out: u64,
    execute: F,
) -> AmmResult<()>
where
    X: Asset,
    Y: Asset,
    I: Asset,
    O: Asset,
    V: AssetVault,
    F: FnOnce(&mut Pool<X, Y>, Balance<I>) -> AmmResult<Balance<O>>,
{
    vault.can_deposit::<O>(caller, amount_out)?;
    let input = vault.withdraw::<I>(caller, amount_in)?;

    let checkpoint = pool.checkpoint();
    let output = match execute(&mut *pool, input) {
        Ok(output) => output,
        Err(error) => {
            vault.deposit(caller, Balance::<I>::new(amount_in))?;
            return Err(error);
        }
    };
    if let Err(error) = vault.deposit(caller, output) {
        pool.restore(checkpoint);
        vault.deposit(caller, Balance::<I>::new(amount_in))?;
        return Err(error.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::test_assets::{Usdc, Weth};
    use crate::error::{AmmError, VaultError};
    use crate::vault::test_vaults::RefusingVault;
    use crate::vault::InMemoryVault;

    fn funded(x: u64, y: u64) -> (InMemoryVault, AccountId) {
        let vault = InMemoryVault::new();
        let caller = AccountId::new("trader");
        vault.credit::<Usdc>(&caller, x).unwrap();
        vault.credit::<Weth>(&caller, y).unwrap();
        (vault, caller)
    }

    fn seeded_handle() -> PoolHandle<Usdc, Weth> {
        let (pool, _) =
            Pool::create_seeded(PoolId(9), 30, Balance::new(1000), Balance::new(1000)).unwrap();
        PoolHandle::new(pool)
    }

    #[test]
    fn test_clones_share_state() {
        let handle = seeded_handle();
        let other = handle.clone();
        other.swap_x_for_y(Balance::new(100)).unwrap();
        assert_eq!(handle.reserves(), (1100, 910, 961));
        assert_eq!(handle.with_pool(|pool| pool.id()), PoolId(9));
    }

    #[test_log::test]
    fn test_routed_swap_credits_caller() {
        let handle = seeded_handle();
        let (vault, caller) = funded(500, 0);

        assert_eq!(handle.swap_x_for_y_for(&vault, &caller, 100), Ok(90));
        assert_eq!(vault.balance_of::<Usdc>(&caller), 400);
        assert_eq!(vault.balance_of::<Weth>(&caller), 90);
        assert_eq!(handle.reserves(), (1100, 910, 961));
    }

    #[test]
    fn test_rejected_swap_keeps_custody() {
        let empty = PoolHandle::new(Pool::<Usdc, Weth>::new(PoolId(2), 30).unwrap());
        let (vault, caller) = funded(500, 500);

        assert_eq!(
            empty.swap_y_for_x_for(&vault, &caller, 100),
            Err(AmmError::EmptyReserves)
        );
        assert_eq!(vault.balance_of::<Weth>(&caller), 500);
    }

    #[test]
    fn test_underfunded_swap_leaves_pool() {
        let handle = seeded_handle();
        let (vault, caller) = funded(50, 0);

        let err = handle.swap_x_for_y_for(&vault, &caller, 100).unwrap_err();
        assert!(matches!(
            err,
            AmmError::Vault(VaultError::InsufficientBalance { requested: 100, available: 50, .. })
        ));
        assert_eq!(handle.reserves(), (1000, 1000, 961));
    }

    #[test]
    fn test_routed_liquidity_round_trip() {
        let handle = PoolHandle::new(Pool::<Usdc, Weth>::new(PoolId(4), 30).unwrap());
        let (vault, caller) = funded(1000, 1000);

        assert_eq!(handle.add_liquidity_for(&vault, &caller, 1000, 1000), Ok(961));
        assert_eq!(vault.shares_of(&caller, PoolId(4)), 961);
        assert_eq!(vault.balance_of::<Usdc>(&caller), 0);

        assert_eq!(
            handle.remove_liquidity_for(&vault, &caller, 961),
            Ok((1000, 1000))
        );
        assert_eq!(vault.shares_of(&caller, PoolId(4)), 0);
        assert_eq!(vault.balance_of::<Usdc>(&caller), 1000);
        assert_eq!(vault.balance_of::<Weth>(&caller), 1000);
        assert_eq!(handle.reserves(), (0, 0, 0));
    }

    #[test]
    fn test_add_liquidity_for_refunds_first_leg() {
        let handle = seeded_handle();
        let (vault, caller) = funded(100, 10);

        let err = handle
            .add_liquidity_for(&vault, &caller, 100, 100)
            .unwrap_err();
        assert!(matches!(err, AmmError::Vault(_)));
        assert_eq!(vault.balance_of::<Usdc>(&caller), 100);
        assert_eq!(vault.balance_of::<Weth>(&caller), 10);
        assert_eq!(handle.reserves(), (1000, 1000, 961));
    }

    #[test]
    fn test_remove_more_shares_than_held() {
        let handle = seeded_handle();
        let (vault, caller) = funded(0, 0);

        let err = handle.remove_liquidity_for(&vault, &caller, 10).unwrap_err();
        assert!(matches!(err, AmmError::Vault(_)));
        assert_eq!(
            handle.remove_liquidity_for(&vault, &caller, 962),
            Err(AmmError::InsufficientShares {
                requested: 962,
                supply: 961,
            })
        );
        assert_eq!(handle.reserves(), (1000, 1000, 961));
    }

    /// Seeded handle whose 961 initial shares sit with `caller` in `vault`
    fn seeded_for(vault: &RefusingVault, caller: &AccountId) -> PoolHandle<Usdc, Weth> {
        let (pool, shares) =
            Pool::create_seeded(PoolId(9), 30, Balance::new(1000), Balance::new(1000)).unwrap();
        vault.inner.deposit_shares(caller, shares).unwrap();
        PoolHandle::new(pool)
    }

    #[test]
    fn test_swap_rejected_when_output_cannot_be_credited() {
        let handle = seeded_handle();
        let (vault, caller) = funded(100, u64::MAX - 10);

        assert_eq!(
            handle.swap_x_for_y_for(&vault, &caller, 100),
            Err(AmmError::Vault(VaultError::BalanceOverflow { asset: "WETH" }))
        );
        assert_eq!(handle.reserves(), (1000, 1000, 961));
        assert_eq!(vault.balance_of::<Usdc>(&caller), 100);
        assert_eq!(vault.balance_of::<Weth>(&caller), u64::MAX - 10);
    }

    #[test_log::test]
    fn test_swap_undone_when_credit_fails_after_commit() {
        let handle = seeded_handle();
        let vault = RefusingVault::new("WETH");
        let caller = AccountId::new("trader");
        vault.inner.credit::<Usdc>(&caller, 500).unwrap();

        assert!(handle.swap_x_for_y_for(&vault, &caller, 100).is_err());
        assert_eq!(handle.reserves(), (1000, 1000, 961));
        assert_eq!(vault.balance_of::<Usdc>(&caller), 500);
        assert_eq!(vault.balance_of::<Weth>(&caller), 0);

        // the restored pool still quotes the undisturbed price
        assert_eq!(handle.quote_x_to_y(100), Ok(90));
    }

    #[test]
    fn test_reverse_swap_undone_when_credit_fails_after_commit() {
        let handle = seeded_handle();
        let vault = RefusingVault::new("USDC");
        let caller = AccountId::new("trader");
        vault.inner.credit::<Weth>(&caller, 100).unwrap();

        assert!(handle.swap_y_for_x_for(&vault, &caller, 100).is_err());
        assert_eq!(handle.reserves(), (1000, 1000, 961));
        assert_eq!(vault.balance_of::<Weth>(&caller), 100);
        assert_eq!(vault.balance_of::<Usdc>(&caller), 0);
    }

    #[test]
    fn test_add_rejected_when_shares_cannot_be_credited() {
        let handle = seeded_handle();
        let (vault, caller) = funded(100, 100);
        vault
            .deposit_shares(&caller, LiquidityShare::<Usdc, Weth>::new(PoolId(9), u64::MAX))
            .unwrap();

        assert_eq!(
            handle.add_liquidity_for(&vault, &caller, 100, 100),
            Err(AmmError::Vault(VaultError::BalanceOverflow { asset: "LSP" }))
        );
        assert_eq!(handle.reserves(), (1000, 1000, 961));
        assert_eq!(vault.balance_of::<Usdc>(&caller), 100);
        assert_eq!(vault.balance_of::<Weth>(&caller), 100);
    }

    #[test]
    fn test_add_undone_when_share_credit_fails_after_commit() {
        let handle = seeded_handle();
        let vault = RefusingVault::new("LSP");
        let caller = AccountId::new("lp");
        vault.inner.credit::<Usdc>(&caller, 300).unwrap();
        vault.inner.credit::<Weth>(&caller, 200).unwrap();

        assert!(handle.add_liquidity_for(&vault, &caller, 100, 100).is_err());
        assert_eq!(handle.reserves(), (1000, 1000, 961));
        assert_eq!(vault.balance_of::<Usdc>(&caller), 300);
        assert_eq!(vault.balance_of::<Weth>(&caller), 200);
        assert_eq!(vault.shares_of(&caller, PoolId(9)), 0);
    }

    #[test]
    fn test_remove_rejected_when_either_leg_cannot_be_credited() {
        let handle = seeded_handle();
        let (vault, caller) = funded(0, u64::MAX);
        vault
            .deposit_shares(&caller, LiquidityShare::<Usdc, Weth>::new(PoolId(9), 100))
            .unwrap();

        assert_eq!(
            handle.remove_liquidity_for(&vault, &caller, 100),
            Err(AmmError::Vault(VaultError::BalanceOverflow { asset: "WETH" }))
        );
        assert_eq!(handle.reserves(), (1000, 1000, 961));
        assert_eq!(vault.shares_of(&caller, PoolId(9)), 100);
        assert_eq!(vault.balance_of::<Usdc>(&caller), 0);
    }

    #[test]
    fn test_remove_undone_when_second_leg_fails_after_commit() {
        let vault = RefusingVault::new("WETH");
        let caller = AccountId::new("lp");
        let handle = seeded_for(&vault, &caller);

        assert!(handle.remove_liquidity_for(&vault, &caller, 961).is_err());
        assert_eq!(handle.reserves(), (1000, 1000, 961));
        assert_eq!(vault.shares_of(&caller, PoolId(9)), 961);
        assert_eq!(vault.balance_of::<Usdc>(&caller), 0);
        assert_eq!(vault.balance_of::<Weth>(&caller), 0);
    }

    #[test]
    fn test_remove_undone_when_first_leg_fails_after_commit() {
        let vault = RefusingVault::new("USDC");
        let caller = AccountId::new("lp");
        let handle = seeded_for(&vault, &caller);

        assert!(handle.remove_liquidity_for(&vault, &caller, 480).is_err());
        assert_eq!(handle.reserves(), (1000, 1000, 961));
        assert_eq!(vault.shares_of(&caller, PoolId(9)), 961);
        assert_eq!(vault.balance_of::<Weth>(&caller), 0);
    }

    #[test]
    fn test_debug_does_not_block_on_held_lock() {
        let handle = seeded_handle();
        let rendered = handle.with_pool(|_| format!("{handle:?}"));
        assert!(rendered.contains("<locked>"));
        assert!(format!("{handle:?}").contains("reserve_x: 1000"));
    }
}
