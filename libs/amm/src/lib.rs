//! # CPAMM - Constant-Product AMM Engine
//!
//! ## Purpose
//!
//! Pool state machine for constant-product liquidity pools pairing two
//! fungible assets. Supports pool creation, two-sided liquidity provision,
//! proportional withdrawal and directional swaps priced by `x * y = k` with
//! an input-side fee, all in exact integer arithmetic.
//!
//! ## Integration Points
//!
//! - **Input Sources**: typed [`Balance`]s released by the hosting ledger
//!   through an [`AssetVault`]
//! - **Output Destinations**: output balances and [`LiquidityShare`]s handed
//!   back for redeposit into the vault
//! - **Identity**: pool ids allocated by the [`PoolRegistry`], caller
//!   identities supplied as [`AccountId`]s
//!
//! ## Architecture Role
//!
//! ```text
//! price_math ──┐
//!              ├──> pool ──> handle ──> registry
//! share_math ──┘              │
//!                           vault
//! ```
//!
//! - [`price_math`]: swap output and integer square root, widened to `u128`
//! - [`share_math`]: share mint on deposit, pro-rata amounts on burn
//! - [`pool`]: reserves, supply and fee with plan-then-commit operations
//! - [`handle`]: one lock per pool; every operation is atomic per pool
//! - [`registry`]: independently addressable pools with runtime asset checks
//!
//! ## Example
//!
//! ```rust
//! use cpamm::{Asset, Balance, PoolRegistry};
//!
//! struct Usdc;
//! struct Weth;
//! impl Asset for Usdc { const SYMBOL: &'static str = "USDC"; }
//! impl Asset for Weth { const SYMBOL: &'static str = "WETH"; }
//!
//! let registry = PoolRegistry::default();
//! let (pool, shares) = registry
//!     .create_seeded_pool::<Usdc, Weth>(30, Balance::new(1000), Balance::new(1000))
//!     .unwrap();
//! assert_eq!(shares.value(), 961);
//!
//! let out = pool.swap_x_for_y(Balance::new(100)).unwrap();
//! assert_eq!(out.value(), 90);
//! assert_eq!(pool.reserves(), (1100, 910, 961));
//! ```

pub mod asset;
pub mod error;
pub mod handle;
pub mod pool;
pub mod pool_traits;
pub mod price_math;
pub mod registry;
pub mod share_math;
pub mod vault;

pub use asset::{Asset, Balance, LiquidityShare, PoolId};
pub use error::{AmmError, AmmResult, VaultError};
pub use handle::PoolHandle;
pub use pool::{Pool, PoolSnapshot, SwapDirection};
pub use pool_traits::{AmmPool, RegisteredPool};
pub use price_math::{get_input_price, isqrt, FEE_SCALING, MAX_POOL_VALUE};
pub use registry::{PoolInfo, PoolRegistry, RegistryStats};
pub use vault::{AccountId, AssetVault, InMemoryVault};

/// Engine configuration types
pub use cpamm_config::EngineConfig;
/// Decimal type returned by [`Pool::spot_price`]
pub use rust_decimal::Decimal;
