//! Coin amounts and exact rational arithmetic

use crate::constants::DECIMALS;
use num_rational::Ratio;
use num_traits::Signed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exact ratio used for every rate, share and percentage in state.
pub type Rational = Ratio<i128>;

/// Build a rational from a numerator and a non-zero denominator.
pub fn rational(numer: i128, denom: i128) -> Rational {
    Ratio::new(numer, denom)
}

/// Lossy conversion used only by the floating-point valuation curves.
pub fn rational_to_f64(value: &Rational) -> f64 {
    *value.numer() as f64 / *value.denom() as f64
}

/// Token amount in base units. Never negative.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Coin(u64);

impl Coin {
    pub const ZERO: Coin = Coin(0);

    pub const fn new(units: u64) -> Self {
        Coin(units)
    }

    /// Whole coins, scaled by `DECIMALS`
    pub const fn from_whole(coins: u64) -> Self {
        Coin(coins * DECIMALS)
    }

    pub const fn units(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Coin) -> Option<Coin> {
        self.0.checked_add(other.0).map(Coin)
    }

    pub fn checked_sub(self, other: Coin) -> Option<Coin> {
        self.0.checked_sub(other.0).map(Coin)
    }

    pub fn to_rational(self) -> Rational {
        Rational::from_integer(self.0 as i128)
    }

    /// Truncates toward zero. `None` when the value is negative or does not fit.
    pub fn from_rational(value: &Rational) -> Option<Coin> {
        if value.is_negative() {
            return None;
        }
        u64::try_from(value.to_integer()).ok().map(Coin)
    }

    /// `self × ratio`, truncated toward zero.
    pub fn mul_rational(self, ratio: &Rational) -> Option<Coin> {
        let units = self.0 as i128;
        // Multiply before dividing so small ratios keep their precision.
        let scaled = units.checked_mul(*ratio.numer())?;
        Coin::from_rational(&Rational::new(scaled, *ratio.denom()))
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl From<u64> for Coin {
    fn from(units: u64) -> Self {
        Coin(units)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:05}", self.0 / DECIMALS, self.0 % DECIMALS)
    }
}

/// Serde adapter storing a `Rational` as `"numer/denom"`.
///
/// The same textual form is used in bincode records, JSON snapshots and
/// genesis files, so a rate reads the same everywhere.
pub mod rational_serde {
    use super::Rational;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Rational, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Rational, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.trim()
            .parse::<Rational>()
            .map_err(|e| de::Error::custom(format!("invalid rational {:?}: {}", text, e)))
    }
}
