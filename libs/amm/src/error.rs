//! Error types for pool operations and asset custody
//!
//! Every variant is a precondition or invariant violation detected before
//! any state is mutated; none of them are transient.

use crate::asset::PoolId;
use thiserror::Error;

/// Errors raised by the asset vault seam
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Owner holds less of an asset than requested
    #[error("{owner} holds {available} {asset}, requested {requested}")]
    InsufficientBalance {
        owner: String,
        asset: &'static str,
        requested: u64,
        available: u64,
    },

    /// Split larger than the balance it is taken from
    #[error("Cannot split {requested} {asset} from a balance of {available}")]
    SplitExceedsBalance {
        asset: &'static str,
        requested: u64,
        available: u64,
    },

    /// Credit would push a holding past `u64::MAX`
    #[error("{asset} balance overflow")]
    BalanceOverflow { asset: &'static str },
}

/// Pool engine errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    /// A required input quantity was zero
    #[error("Input amount must be non-zero")]
    ZeroAmount,

    /// Fee at or above 100%
    #[error("Invalid fee: {fee_bps} bps must be below 10000")]
    InvalidFee { fee_bps: u64 },

    /// Swap against a pool with an empty reserve on either side
    #[error("Pool reserves are empty")]
    EmptyReserves,

    /// A reserve or the share supply would reach the pool ceiling
    #[error("Pool is full: reserve would reach MAX_POOL_VALUE")]
    PoolOverflow,

    /// Burn request larger than the outstanding share supply
    #[error("Cannot burn {requested} shares, supply is {supply}")]
    InsufficientShares { requested: u64, supply: u64 },

    /// Shares issued by one pool presented to another
    #[error("Shares belong to pool {actual}, expected pool {expected}")]
    PoolMismatch { expected: PoolId, actual: PoolId },

    /// Registered pool pairs different asset types than requested
    #[error("Pool {pool_id} does not pair the requested assets")]
    AssetMismatch { pool_id: PoolId },

    /// No pool registered under this id
    #[error("Pool not found: {0}")]
    PoolNotFound(PoolId),

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),
}

/// Result alias for pool engine operations
pub type AmmResult<T> = Result<T, AmmError>;
