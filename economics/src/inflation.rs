//! Inflation ledger
//!
//! Holds total-supply metadata, the annually recomputed growth rate and the
//! four inflation pools. Pools are seeded once a year from
//! `total_supply × growth_rate × allocation` and drained by straight-line
//! declining-balance payouts.

use crate::error::{LedgerError, LedgerResult};
use cadence_core::{rational, rational_serde, Coin, Rational};
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four inflation pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolId {
    Infra,
    ContentCreator,
    Developer,
    Validator,
}

impl PoolId {
    pub const ALL: [PoolId; 4] = [
        PoolId::Infra,
        PoolId::ContentCreator,
        PoolId::Developer,
        PoolId::Validator,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PoolId::Infra => "infra",
            PoolId::ContentCreator => "content_creator",
            PoolId::Developer => "developer",
            PoolId::Validator => "validator",
        }
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PoolId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoolId::ALL
            .into_iter()
            .find(|pool| pool.name() == s)
            .ok_or_else(|| format!("unknown inflation pool: {}", s))
    }
}

/// Supply and growth-rate metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMeta {
    pub total_supply: Coin,
    pub last_year_consumption: Coin,
    pub cumulative_consumption: Coin,
    #[serde(with = "rational_serde")]
    pub growth_rate: Rational,
    #[serde(with = "rational_serde")]
    pub floor: Rational,
    #[serde(with = "rational_serde")]
    pub ceiling: Rational,
}

/// Undistributed inflation for the current year
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflationPools {
    pub infra: Coin,
    pub content_creator: Coin,
    pub developer: Coin,
    pub validator: Coin,
}

impl InflationPools {
    pub fn get(&self, pool: PoolId) -> Coin {
        match pool {
            PoolId::Infra => self.infra,
            PoolId::ContentCreator => self.content_creator,
            PoolId::Developer => self.developer,
            PoolId::Validator => self.validator,
        }
    }

    fn slot(&mut self, pool: PoolId) -> &mut Coin {
        match pool {
            PoolId::Infra => &mut self.infra,
            PoolId::ContentCreator => &mut self.content_creator,
            PoolId::Developer => &mut self.developer,
            PoolId::Validator => &mut self.validator,
        }
    }

    pub fn total(&self) -> Option<Coin> {
        PoolId::ALL
            .into_iter()
            .try_fold(Coin::ZERO, |acc, pool| acc.checked_add(self.get(pool)))
    }
}

/// Share of annual inflation routed to each pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalAllocation {
    #[serde(with = "rational_serde")]
    pub infra: Rational,
    #[serde(with = "rational_serde")]
    pub content_creator: Rational,
    #[serde(with = "rational_serde")]
    pub developer: Rational,
    #[serde(with = "rational_serde")]
    pub validator: Rational,
}

impl Default for GlobalAllocation {
    fn default() -> Self {
        Self {
            infra: rational(20, 100),
            content_creator: rational(50, 100),
            developer: rational(20, 100),
            validator: rational(10, 100),
        }
    }
}

impl GlobalAllocation {
    pub fn fraction(&self, pool: PoolId) -> Rational {
        match pool {
            PoolId::Infra => self.infra,
            PoolId::ContentCreator => self.content_creator,
            PoolId::Developer => self.developer,
            PoolId::Validator => self.validator,
        }
    }

    pub fn sum(&self) -> Rational {
        PoolId::ALL
            .into_iter()
            .fold(Rational::zero(), |acc, pool| acc + self.fraction(pool))
    }

    /// Each fraction in [0, 1] and the four together at most 1
    pub fn validate(&self) -> LedgerResult<()> {
        for pool in PoolId::ALL {
            let fraction = self.fraction(pool);
            if fraction.is_negative() || fraction > Rational::one() {
                return Err(LedgerError::InvalidAllocation(format!(
                    "{} fraction {} is outside [0, 1]",
                    pool, fraction
                )));
            }
        }

        let sum = self.sum();
        if sum > Rational::one() {
            return Err(LedgerError::InvalidAllocation(format!(
                "allocations sum to {}, more than 1",
                sum
            )));
        }

        Ok(())
    }
}

fn validate_bounds(floor: &Rational, ceiling: &Rational) -> LedgerResult<()> {
    if floor.is_negative() || *ceiling > Rational::one() {
        return Err(LedgerError::InvalidGrowthBounds(format!(
            "floor {} and ceiling {} must lie in [0, 1]",
            floor, ceiling
        )));
    }
    if floor > ceiling {
        return Err(LedgerError::InvalidGrowthBounds(format!(
            "floor {} is above ceiling {}",
            floor, ceiling
        )));
    }
    Ok(())
}

fn clamp_rate(rate: Rational, floor: &Rational, ceiling: &Rational) -> Rational {
    rate.max(*floor).min(*ceiling)
}

#[derive(Debug, Clone, PartialEq)]
pub struct InflationLedger {
    meta: GlobalMeta,
    pools: InflationPools,
    allocation: GlobalAllocation,
}

impl InflationLedger {
    /// Seed metadata and pools at genesis
    pub fn init(
        total_supply: Coin,
        growth_rate: Rational,
        floor: Rational,
        ceiling: Rational,
        allocation: GlobalAllocation,
    ) -> LedgerResult<Self> {
        validate_bounds(&floor, &ceiling)?;
        if growth_rate < floor || growth_rate > ceiling {
            return Err(LedgerError::InvalidGrowthBounds(format!(
                "growth rate {} is outside [{}, {}]",
                growth_rate, floor, ceiling
            )));
        }
        allocation.validate()?;

        let mut ledger = Self {
            meta: GlobalMeta {
                total_supply,
                last_year_consumption: Coin::ZERO,
                cumulative_consumption: Coin::ZERO,
                growth_rate,
                floor,
                ceiling,
            },
            pools: InflationPools::default(),
            allocation,
        };
        ledger.seed_pools()?;
        Ok(ledger)
    }

    /// Rebuild from persisted records
    pub fn from_parts(meta: GlobalMeta, pools: InflationPools, allocation: GlobalAllocation) -> Self {
        Self {
            meta,
            pools,
            allocation,
        }
    }

    pub fn into_parts(self) -> (GlobalMeta, InflationPools, GlobalAllocation) {
        (self.meta, self.pools, self.allocation)
    }

    pub fn meta(&self) -> &GlobalMeta {
        &self.meta
    }

    pub fn pools(&self) -> &InflationPools {
        &self.pools
    }

    pub fn allocation(&self) -> &GlobalAllocation {
        &self.allocation
    }

    pub fn balance(&self, pool: PoolId) -> Coin {
        self.pools.get(pool)
    }

    /// Annual growth-rate update followed by a full replacement of the pools.
    ///
    /// With no consumption recorded last year the growth rate is carried over.
    pub fn recalculate_annual(&mut self, cumulative: Coin) -> LedgerResult<()> {
        let last = self.meta.last_year_consumption;
        if !last.is_zero() {
            let last_units = last.units() as i128;
            let change = Rational::new(cumulative.units() as i128 - last_units, last_units);
            self.meta.growth_rate = clamp_rate(change, &self.meta.floor, &self.meta.ceiling);
        }

        self.meta.last_year_consumption = cumulative;
        self.meta.cumulative_consumption = Coin::ZERO;
        self.seed_pools()?;

        log::info!(
            "Annual inflation recalculated: growth {} on supply {}, consumption {}",
            self.meta.growth_rate,
            self.meta.total_supply,
            cumulative
        );
        Ok(())
    }

    /// Straight-line declining-balance payout for one period.
    ///
    /// Paying once per period for `periods_elapsed = 1..=periods_per_year`
    /// empties the pool exactly on the final call. Paid coins are newly
    /// minted, so total supply grows by the same amount.
    pub fn payout_periodic(
        &mut self,
        pool: PoolId,
        periods_elapsed: i64,
        periods_per_year: i64,
    ) -> LedgerResult<Coin> {
        let periods_left = periods_per_year
            .checked_sub(periods_elapsed)
            .and_then(|left| left.checked_add(1))
            .filter(|left| *left > 0)
            .ok_or(LedgerError::DivideByZeroPeriod {
                elapsed: periods_elapsed,
                periods_per_year,
            })?;

        let available = self.pools.get(pool);
        let amount = Coin::new(available.units() / periods_left as u64);

        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                pool,
                requested: amount,
                available,
            })?;
        let total_supply = self
            .meta
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("total supply"))?;

        *self.pools.slot(pool) = remaining;
        self.meta.total_supply = total_supply;

        log::debug!(
            "Paid {} from {} pool (period {} of {})",
            amount,
            pool,
            periods_elapsed,
            periods_per_year
        );
        Ok(amount)
    }

    /// Record consumption toward next year's growth rate
    pub fn add_consumption(&mut self, coin: Coin) -> LedgerResult<()> {
        self.meta.cumulative_consumption = self
            .meta
            .cumulative_consumption
            .checked_add(coin)
            .ok_or(LedgerError::Overflow("cumulative consumption"))?;
        Ok(())
    }

    /// Takes effect at the next annual recalculation
    pub fn set_allocation(&mut self, allocation: GlobalAllocation) -> LedgerResult<()> {
        allocation.validate()?;
        self.allocation = allocation;
        Ok(())
    }

    /// New bounds apply immediately; the current rate is re-clamped.
    pub fn set_growth_bounds(&mut self, floor: Rational, ceiling: Rational) -> LedgerResult<()> {
        validate_bounds(&floor, &ceiling)?;
        self.meta.growth_rate = clamp_rate(self.meta.growth_rate, &floor, &ceiling);
        self.meta.floor = floor;
        self.meta.ceiling = ceiling;
        Ok(())
    }

    fn seed_pools(&mut self) -> LedgerResult<()> {
        let mut pools = InflationPools::default();
        for pool in PoolId::ALL {
            let share = self.meta.growth_rate * self.allocation.fraction(pool);
            *pools.slot(pool) = self
                .meta
                .total_supply
                .mul_rational(&share)
                .ok_or(LedgerError::Overflow("pool seeding"))?;
        }
        self.pools = pools;
        Ok(())
    }
}
