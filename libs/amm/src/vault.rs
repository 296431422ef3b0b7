//! Asset custody seam
//!
//! Pools never hold caller accounts. The hosting ledger implements
//! [`AssetVault`] to turn holdings into [`Balance`]s the pool consumes and
//! to take pool outputs back into custody for a caller.

use crate::asset::{Asset, Balance, LiquidityShare, PoolId};
use crate::error::VaultError;
use dashmap::DashMap;
use std::any::TypeId;
use std::fmt;
use tracing::debug;

/// Identity of the party invoking an operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Custody of fungible assets and pool shares on behalf of accounts
pub trait AssetVault: Send + Sync {
    /// Move `amount` of `A` out of `owner`'s holding
    fn withdraw<A: Asset>(&self, owner: &AccountId, amount: u64) -> Result<Balance<A>, VaultError>;

    /// Credit a balance to `owner`
    fn deposit<A: Asset>(&self, owner: &AccountId, balance: Balance<A>) -> Result<(), VaultError>;

    /// Move `amount` shares of `pool_id` out of `owner`'s holding
    fn withdraw_shares<X: Asset, Y: Asset>(
        &self,
        owner: &AccountId,
        pool_id: PoolId,
        amount: u64,
    ) -> Result<LiquidityShare<X, Y>, VaultError>;

    /// Credit shares to `owner`
    fn deposit_shares<X: Asset, Y: Asset>(
        &self,
        owner: &AccountId,
        shares: LiquidityShare<X, Y>,
    ) -> Result<(), VaultError>;

    /// Whether crediting `amount` of `A` to `owner` would succeed right now
    fn can_deposit<A: Asset>(&self, owner: &AccountId, amount: u64) -> Result<(), VaultError>;

    /// Whether crediting `amount` shares of `pool_id` to `owner` would succeed right now
    fn can_deposit_shares(
        &self,
        owner: &AccountId,
        pool_id: PoolId,
        amount: u64,
    ) -> Result<(), VaultError>;

    fn balance_of<A: Asset>(&self, owner: &AccountId) -> u64;

    fn shares_of(&self, owner: &AccountId, pool_id: PoolId) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Holding {
    Asset(TypeId),
    Shares(PoolId),
}

/// `DashMap`-backed vault for tests and single-process hosts
#[derive(Debug, Default)]
pub struct InMemoryVault {
    holdings: DashMap<(AccountId, Holding), u64>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` of `A` into `owner`'s holding
    pub fn credit<A: Asset>(&self, owner: &AccountId, amount: u64) -> Result<(), VaultError> {
        self.deposit(owner, Balance::<A>::new(amount))
    }

    fn take(
        &self,
        owner: &AccountId,
        holding: Holding,
        asset: &'static str,
        amount: u64,
    ) -> Result<(), VaultError> {
        let insufficient = |available| VaultError::InsufficientBalance {
            owner: owner.to_string(),
            asset,
            requested: amount,
            available,
        };

        let mut entry = self
            .holdings
            .get_mut(&(owner.clone(), holding))
            .ok_or_else(|| insufficient(0))?;
        if *entry < amount {
            return Err(insufficient(*entry));
        }
        *entry -= amount;
        Ok(())
    }

    fn put(
        &self,
        owner: &AccountId,
        holding: Holding,
        asset: &'static str,
        amount: u64,
    ) -> Result<(), VaultError> {
        let mut entry = self.holdings.entry((owner.clone(), holding)).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(VaultError::BalanceOverflow { asset })?;
        Ok(())
    }

    fn fits(
        &self,
        owner: &AccountId,
        holding: Holding,
        asset: &'static str,
        amount: u64,
    ) -> Result<(), VaultError> {
        self.held(owner, holding)
            .checked_add(amount)
            .map(|_| ())
            .ok_or(VaultError::BalanceOverflow { asset })
    }

    fn held(&self, owner: &AccountId, holding: Holding) -> u64 {
        self.holdings
            .get(&(owner.clone(), holding))
            .map(|entry| *entry)
            .unwrap_or(0)
    }
}

impl AssetVault for InMemoryVault {
    fn withdraw<A: Asset>(&self, owner: &AccountId, amount: u64) -> Result<Balance<A>, VaultError> {
        self.take(owner, Holding::Asset(TypeId::of::<A>()), A::SYMBOL, amount)?;
        debug!(%owner, asset = A::SYMBOL, amount, "Vault withdrawal");
        Ok(Balance::new(amount))
    }

    fn deposit<A: Asset>(&self, owner: &AccountId, balance: Balance<A>) -> Result<(), VaultError> {
        let amount = balance.value();
        self.put(owner, Holding::Asset(TypeId::of::<A>()), A::SYMBOL, amount)?;
        debug!(%owner, asset = A::SYMBOL, amount, "Vault deposit");
        Ok(())
    }

    fn withdraw_shares<X: Asset, Y: Asset>(
        &self,
        owner: &AccountId,
        pool_id: PoolId,
        amount: u64,
    ) -> Result<LiquidityShare<X, Y>, VaultError> {
        self.take(owner, Holding::Shares(pool_id), "LSP", amount)?;
        Ok(LiquidityShare::new(pool_id, amount))
    }

    fn deposit_shares<X: Asset, Y: Asset>(
        &self,
        owner: &AccountId,
        shares: LiquidityShare<X, Y>,
    ) -> Result<(), VaultError> {
        self.put(owner, Holding::Shares(shares.pool_id()), "LSP", shares.value())
    }

    fn can_deposit<A: Asset>(&self, owner: &AccountId, amount: u64) -> Result<(), VaultError> {
        self.fits(owner, Holding::Asset(TypeId::of::<A>()), A::SYMBOL, amount)
    }

    fn can_deposit_shares(
        &self,
        owner: &AccountId,
        pool_id: PoolId,
        amount: u64,
    ) -> Result<(), VaultError> {
        self.fits(owner, Holding::Shares(pool_id), "LSP", amount)
    }

    fn balance_of<A: Asset>(&self, owner: &AccountId) -> u64 {
        self.held(owner, Holding::Asset(TypeId::of::<A>()))
    }

    fn shares_of(&self, owner: &AccountId, pool_id: PoolId) -> u64 {
        self.held(owner, Holding::Shares(pool_id))
    }
}
