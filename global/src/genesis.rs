//! Genesis parameters for the global engine

use crate::error::{GlobalError, Result};
use cadence_core::{rational, rational_serde, Coin, Rational};
use economics::consumption::DEFAULT_FREEZING_PERIOD_SECONDS;
use economics::{defaults, ContentValuationParams, GlobalAllocation};
use num_traits::{One, Signed};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisParams {
    pub total_supply: Coin,
    #[serde(with = "rational_serde")]
    pub default_growth_rate: Rational,
    #[serde(with = "rational_serde")]
    pub floor: Rational,
    #[serde(with = "rational_serde")]
    pub ceiling: Rational,
    #[serde(with = "rational_serde")]
    pub infra_allocation: Rational,
    #[serde(with = "rational_serde")]
    pub content_allocation: Rational,
    #[serde(with = "rational_serde")]
    pub developer_allocation: Rational,
    #[serde(with = "rational_serde")]
    pub validator_allocation: Rational,
    #[serde(with = "rational_serde")]
    pub friction_rate: Rational,
    pub freezing_period_seconds: i64,
    #[serde(with = "rational_serde")]
    pub max_tps_seed: Rational,
    pub evaluation_params: ContentValuationParams,
    /// Block time of the genesis block, seconds since epoch
    pub genesis_time: i64,
}

impl Default for GenesisParams {
    fn default() -> Self {
        let allocation = GlobalAllocation::default();
        Self {
            total_supply: defaults::TOTAL_SUPPLY,
            default_growth_rate: defaults::growth_rate(),
            floor: defaults::growth_floor(),
            ceiling: defaults::growth_ceiling(),
            infra_allocation: allocation.infra,
            content_allocation: allocation.content_creator,
            developer_allocation: allocation.developer,
            validator_allocation: allocation.validator,
            friction_rate: rational(5, 100),
            freezing_period_seconds: DEFAULT_FREEZING_PERIOD_SECONDS,
            max_tps_seed: Rational::from_integer(defaults::MAX_TPS_SEED),
            evaluation_params: ContentValuationParams::default(),
            genesis_time: 0,
        }
    }
}

fn invalid(reason: String) -> GlobalError {
    GlobalError::InvalidGenesisConfig(reason)
}

fn check_fraction(name: &str, value: &Rational) -> Result<()> {
    if value.is_negative() || *value > Rational::one() {
        return Err(invalid(format!("{} {} is outside [0, 1]", name, value)));
    }
    Ok(())
}

impl GenesisParams {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| invalid(format!("malformed genesis: {}", e)))
    }

    pub fn allocation(&self) -> GlobalAllocation {
        GlobalAllocation {
            infra: self.infra_allocation,
            content_creator: self.content_allocation,
            developer: self.developer_allocation,
            validator: self.validator_allocation,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("default growth rate", &self.default_growth_rate),
            ("growth floor", &self.floor),
            ("growth ceiling", &self.ceiling),
            ("infra allocation", &self.infra_allocation),
            ("content allocation", &self.content_allocation),
            ("developer allocation", &self.developer_allocation),
            ("validator allocation", &self.validator_allocation),
            ("friction rate", &self.friction_rate),
        ];
        for (name, value) in fractions {
            check_fraction(name, value)?;
        }

        let allocated = self.allocation().sum();
        if allocated > Rational::one() {
            return Err(invalid(format!(
                "allocations sum to {}, more than 1",
                allocated
            )));
        }

        if self.floor > self.default_growth_rate || self.default_growth_rate > self.ceiling {
            return Err(invalid(format!(
                "growth rate {} is outside [{}, {}]",
                self.default_growth_rate, self.floor, self.ceiling
            )));
        }

        if self.freezing_period_seconds <= 0 {
            return Err(invalid(format!(
                "freezing period must be positive, got {}s",
                self.freezing_period_seconds
            )));
        }

        if !self.max_tps_seed.is_positive() {
            return Err(invalid(format!(
                "max TPS seed must be positive, got {}",
                self.max_tps_seed
            )));
        }

        if self.genesis_time < 0 {
            return Err(invalid(format!(
                "genesis time {} is before the epoch",
                self.genesis_time
            )));
        }

        self.evaluation_params.validate().map_err(invalid)
    }
}
