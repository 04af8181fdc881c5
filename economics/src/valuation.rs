//! Content valuation curves
//!
//! Converts a raw payment into an "evaluated" weight. Three logistic curves
//! damp the payment by post age, by how much the post has already earned,
//! and by how many times the payer has paid the same author.
//!
//! These use `f64` transcendental functions. Results are not guaranteed to be
//! bit-identical across CPU architectures; a deterministic fixed-point
//! approximation should replace them once the tolerated divergence is agreed.

use cadence_core::{rational, rational_serde, rational_to_f64, Coin, Rational};
use num_traits::Signed;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentValuationParams {
    /// Seconds per unit of post age
    pub time_base: i64,
    pub time_offset: i64,
    /// Earned reward per unit of the total-consumption curve
    pub total_base: Coin,
    pub total_offset: i64,
    pub count_offset: i64,
    #[serde(with = "rational_serde")]
    pub exponent: Rational,
}

impl Default for ContentValuationParams {
    fn default() -> Self {
        Self {
            time_base: 3_153_600,
            time_offset: 5,
            total_base: Coin::from_whole(1_000),
            total_offset: 5,
            count_offset: 7,
            exponent: rational(8, 10),
        }
    }
}

impl ContentValuationParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.time_base <= 0 {
            return Err(format!("time base must be positive, got {}", self.time_base));
        }
        if self.total_base.is_zero() {
            return Err("total consumption base must be positive".to_string());
        }
        if self.exponent.is_negative() {
            return Err(format!("exponent {} must not be negative", self.exponent));
        }
        Ok(())
    }
}

fn logistic_decay(x: f64) -> f64 {
    1.0 / (1.0 + x.exp())
}

/// `1 / (1 + e^(elapsed/base − offset))`, decreasing in `elapsed`, in (0, 1)
pub fn time_adjustment(elapsed: i64, base: i64, offset: i64) -> f64 {
    logistic_decay(elapsed as f64 / base as f64 - offset as f64)
}

/// `1 / (1 + e^(total/base − offset)) + 1`, decreasing in `total_reward`, in (1, 2)
pub fn total_consumption_adjustment(total_reward: Coin, base: Coin, offset: i64) -> f64 {
    logistic_decay(total_reward.as_f64() / base.as_f64() - offset as f64) + 1.0
}

/// `1 / (1 + e^(count − offset)) + 1`, decreasing in `count`, in (1, 2)
pub fn count_adjustment(count: i64, offset: i64) -> f64 {
    logistic_decay(count as f64 - offset as f64) + 1.0
}

/// Evaluated weight of a payment, truncated to whole base units
pub fn evaluate(
    coin: Coin,
    count: i64,
    elapsed: i64,
    total_reward: Coin,
    params: &ContentValuationParams,
) -> Coin {
    let weight = coin.as_f64().powf(rational_to_f64(&params.exponent))
        * total_consumption_adjustment(total_reward, params.total_base, params.total_offset)
        * time_adjustment(elapsed, params.time_base, params.time_offset)
        * count_adjustment(count, params.count_offset);

    // Float-to-int `as` saturates and maps NaN to zero
    Coin::new(weight.floor() as u64)
}
