//! Cadence Economics Module
//!
//! Implements the economic model of the global engine:
//! - Annual growth rate and the four inflation pools
//! - The friction-funded consumption reward window
//! - Content valuation curves
//! - The congestion meter used for admission control

pub mod congestion;
pub mod consumption;
pub mod error;
pub mod inflation;
pub mod valuation;

pub use congestion::{CongestionMeter, CongestionState};
pub use consumption::{ConsumptionMeta, ConsumptionRewardWindow};
pub use error::{LedgerError, LedgerResult, RewardError, RewardResult};
pub use inflation::{GlobalAllocation, GlobalMeta, InflationLedger, InflationPools, PoolId};
pub use valuation::ContentValuationParams;

/// Reference network parameters
pub mod defaults {
    use cadence_core::{rational, Coin, Rational};

    /// Genesis supply (10 billion coins)
    pub const TOTAL_SUPPLY: Coin = Coin::from_whole(10_000_000_000);

    /// Peak transactions per second assumed before any block is observed
    pub const MAX_TPS_SEED: i128 = 1_000;

    pub fn growth_rate() -> Rational {
        rational(98, 1000)
    }

    pub fn growth_floor() -> Rational {
        rational(30, 1000)
    }

    pub fn growth_ceiling() -> Rational {
        rational(98, 1000)
    }
}
