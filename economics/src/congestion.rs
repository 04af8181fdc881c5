//! Congestion meter (transactions per second against the observed peak)

use cadence_core::{rational_serde, Rational};
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionState {
    #[serde(with = "rational_serde")]
    pub current_tps: Rational,
    #[serde(with = "rational_serde")]
    pub max_tps_observed: Rational,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CongestionMeter {
    state: CongestionState,
}

impl CongestionMeter {
    /// `max_tps_seed` must be positive so the ratio is always defined
    pub fn new(max_tps_seed: Rational) -> Self {
        Self {
            state: CongestionState {
                current_tps: Rational::zero(),
                max_tps_observed: max_tps_seed,
            },
        }
    }

    pub fn from_state(state: CongestionState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &CongestionState {
        &self.state
    }

    pub fn into_state(self) -> CongestionState {
        self.state
    }

    pub fn update(&mut self, tx_count: i64, block_time: i64, last_block_time: i64) {
        let elapsed = block_time.saturating_sub(last_block_time);
        self.state.current_tps = if elapsed <= 0 {
            Rational::zero()
        } else {
            Rational::new(tx_count.max(0) as i128, elapsed as i128)
        };

        if self.state.current_tps > self.state.max_tps_observed {
            self.state.max_tps_observed = self.state.current_tps;
        }
    }

    /// Current throughput relative to the peak, in [0, 1]
    pub fn capacity_ratio(&self) -> Rational {
        if !self.state.max_tps_observed.is_positive() {
            return Rational::zero();
        }
        self.state.current_tps / self.state.max_tps_observed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::rational;
    use num_traits::One;

    #[test]
    fn test_same_block_time_is_idle() {
        let mut meter = CongestionMeter::new(Rational::from_integer(1000));
        meter.update(500, 100, 100);
        assert_eq!(meter.state().current_tps, Rational::zero());
        assert_eq!(meter.capacity_ratio(), Rational::zero());
    }

    #[test]
    fn test_ratio_against_seed() {
        let mut meter = CongestionMeter::new(Rational::from_integer(1000));
        meter.update(1500, 103, 100);
        assert_eq!(meter.state().current_tps, Rational::from_integer(500));
        assert_eq!(meter.capacity_ratio(), rational(1, 2));
    }

    #[test]
    fn test_peak_tracks_busiest_block() {
        let mut meter = CongestionMeter::new(Rational::from_integer(10));
        meter.update(60, 3, 0);
        assert_eq!(meter.state().max_tps_observed, Rational::from_integer(20));
        assert_eq!(meter.capacity_ratio(), Rational::one());

        meter.update(7, 5, 3);
        assert_eq!(meter.capacity_ratio(), rational(7, 40));
    }

    #[test]
    fn test_ratio_always_within_unit_interval() {
        let mut meter = CongestionMeter::new(Rational::from_integer(1));
        let mut last = 0;
        for (i, tx_count) in [0i64, 5, 100, 3, 0, 42, 7, 1_000, 1].into_iter().enumerate() {
            let time = last + (i as i64 % 3);
            meter.update(tx_count, time, last);
            let ratio = meter.capacity_ratio();
            assert!(ratio >= Rational::zero() && ratio <= Rational::one(), "ratio {}", ratio);
            assert!(meter.state().max_tps_observed >= meter.state().current_tps);
            last = time;
        }
    }
}
