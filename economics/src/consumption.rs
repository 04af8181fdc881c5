//! Consumption reward window
//!
//! Friction skimmed off each payment funds a reward pool. The evaluated
//! weight of the payment joins a rolling window; once the freezing period
//! ends the author claims `pool × weight / window` and the weight leaves the
//! window again.

use crate::error::{RewardError, RewardResult};
use cadence_core::constants::SECONDS_PER_DAY;
use cadence_core::{rational, rational_serde, Coin, Rational, Scheduler};
use num_traits::{CheckedMul, One, Signed};
use serde::{Deserialize, Serialize};

/// Default friction skimmed from every payment (5%)
pub const DEFAULT_FRICTION_RATE: (i128, i128) = (5, 100);

/// Default delay before a reward can be claimed (7 days)
pub const DEFAULT_FREEZING_PERIOD_SECONDS: i64 = 7 * SECONDS_PER_DAY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionMeta {
    #[serde(with = "rational_serde")]
    pub friction_rate: Rational,
    pub reward_pool: Coin,
    pub window: Coin,
    pub freezing_period_seconds: i64,
}

impl Default for ConsumptionMeta {
    fn default() -> Self {
        let (numer, denom) = DEFAULT_FRICTION_RATE;
        Self {
            friction_rate: rational(numer, denom),
            reward_pool: Coin::ZERO,
            window: Coin::ZERO,
            freezing_period_seconds: DEFAULT_FREEZING_PERIOD_SECONDS,
        }
    }
}

fn validate_friction_rate(rate: &Rational) -> RewardResult<()> {
    if rate.is_negative() || *rate > Rational::one() {
        return Err(RewardError::InvalidParameter(format!(
            "friction rate {} is outside [0, 1]",
            rate
        )));
    }
    Ok(())
}

fn validate_freezing_period(seconds: i64) -> RewardResult<()> {
    if seconds <= 0 {
        return Err(RewardError::InvalidParameter(format!(
            "freezing period must be positive, got {}s",
            seconds
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionRewardWindow {
    meta: ConsumptionMeta,
}

impl ConsumptionRewardWindow {
    /// Empty pool and window
    pub fn new(friction_rate: Rational, freezing_period_seconds: i64) -> RewardResult<Self> {
        validate_friction_rate(&friction_rate)?;
        validate_freezing_period(freezing_period_seconds)?;
        Ok(Self {
            meta: ConsumptionMeta {
                friction_rate,
                freezing_period_seconds,
                ..ConsumptionMeta::default()
            },
        })
    }

    pub fn from_meta(meta: ConsumptionMeta) -> Self {
        Self { meta }
    }

    pub fn meta(&self) -> &ConsumptionMeta {
        &self.meta
    }

    pub fn into_meta(self) -> ConsumptionMeta {
        self.meta
    }

    pub fn friction_rate(&self) -> Rational {
        self.meta.friction_rate
    }

    /// Friction owed on a payment of `payment`
    pub fn friction_for(&self, payment: Coin) -> RewardResult<Coin> {
        payment
            .mul_rational(&self.meta.friction_rate)
            .ok_or(RewardError::Overflow("friction"))
    }

    /// Add the friction to the pool, the evaluated weight to the window, and
    /// schedule `event` for the end of the freezing period.
    ///
    /// Nothing changes if the event cannot be scheduled.
    pub fn fund_and_register<E, S>(
        &mut self,
        friction: Coin,
        evaluated: Coin,
        event: E,
        scheduler: &mut S,
        now: i64,
    ) -> RewardResult<()>
    where
        S: Scheduler<E> + ?Sized,
    {
        let reward_pool = self
            .meta
            .reward_pool
            .checked_add(friction)
            .ok_or(RewardError::Overflow("reward pool"))?;
        let window = self
            .meta
            .window
            .checked_add(evaluated)
            .ok_or(RewardError::Overflow("evaluation window"))?;
        let instant = now
            .checked_add(self.meta.freezing_period_seconds)
            .ok_or(RewardError::Overflow("freezing instant"))?;

        scheduler.register_at(instant, event, now)?;

        self.meta.reward_pool = reward_pool;
        self.meta.window = window;
        log::debug!(
            "Content reward funded: friction {}, evaluated {}, claimable at {}",
            friction,
            evaluated,
            instant
        );
        Ok(())
    }

    /// Pay out the share of the pool that `coin` represents in the window,
    /// reduced by `penalty`, and remove `coin` from the window.
    pub fn claim(&mut self, coin: Coin, penalty: Rational) -> RewardResult<Coin> {
        if coin.is_zero() {
            return Ok(Coin::ZERO);
        }
        if penalty.is_negative() || penalty > Rational::one() {
            return Err(RewardError::InvalidPenalty(penalty.to_string()));
        }

        let window = self.meta.window;
        let remaining_window = window
            .checked_sub(coin)
            .ok_or(RewardError::WindowUnderflow { window, coin })?;

        let share = Rational::new(coin.units() as i128, window.units() as i128)
            .checked_mul(&(Rational::one() - penalty))
            .ok_or(RewardError::Overflow("reward share"))?;
        let reward = self
            .meta
            .reward_pool
            .mul_rational(&share)
            .ok_or(RewardError::Overflow("reward"))?;
        let remaining_pool = self
            .meta
            .reward_pool
            .checked_sub(reward)
            .ok_or(RewardError::Overflow("reward pool"))?;

        self.meta.reward_pool = remaining_pool;
        self.meta.window = remaining_window;
        log::debug!(
            "Reward claimed: {} for weight {} (penalty {}), pool now {}",
            reward,
            coin,
            penalty,
            remaining_pool
        );
        Ok(reward)
    }

    /// Top up the pool without adding weight, e.g. from inflation
    pub fn fund_pool(&mut self, coin: Coin) -> RewardResult<()> {
        self.meta.reward_pool = self
            .meta
            .reward_pool
            .checked_add(coin)
            .ok_or(RewardError::Overflow("reward pool"))?;
        Ok(())
    }

    pub fn set_friction_rate(&mut self, rate: Rational) -> RewardResult<()> {
        validate_friction_rate(&rate)?;
        self.meta.friction_rate = rate;
        Ok(())
    }

    pub fn set_freezing_period(&mut self, seconds: i64) -> RewardResult<()> {
        validate_freezing_period(seconds)?;
        self.meta.freezing_period_seconds = seconds;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{check_instant, SchedulingError};
    use num_traits::Zero;

    #[derive(Default)]
    struct RecordingScheduler {
        registered: Vec<(i64, &'static str)>,
    }

    impl Scheduler<&'static str> for RecordingScheduler {
        fn register_at(
            &mut self,
            instant: i64,
            event: &'static str,
            now: i64,
        ) -> Result<(), SchedulingError> {
            check_instant(instant, now)?;
            self.registered.push((instant, event));
            Ok(())
        }
    }

    fn window_with(pool: u64, window: u64) -> ConsumptionRewardWindow {
        ConsumptionRewardWindow::from_meta(ConsumptionMeta {
            reward_pool: Coin::new(pool),
            window: Coin::new(window),
            ..ConsumptionMeta::default()
        })
    }

    #[test]
    fn test_claim_reference_table() {
        let mut window = window_with(1000, 10);
        let reward = window.claim(Coin::new(1), Rational::zero()).unwrap();
        assert_eq!(reward, Coin::new(100));
        assert_eq!(window.meta().reward_pool, Coin::new(900));
        assert_eq!(window.meta().window, Coin::new(9));
    }

    #[test]
    fn test_claim_with_penalty() {
        let mut window = window_with(1000, 10);
        let reward = window.claim(Coin::new(5), rational(1, 2)).unwrap();
        assert_eq!(reward, Coin::new(250));
        assert_eq!(window.meta().reward_pool, Coin::new(750));
        assert_eq!(window.meta().window, Coin::new(5));

        assert!(matches!(
            window.claim(Coin::new(1), rational(3, 2)),
            Err(RewardError::InvalidPenalty(_))
        ));
    }

    #[test]
    fn test_claim_share_overflow_is_an_error() {
        let mut window = window_with(1000, 10);
        let penalty = Rational::new(i128::MAX - 1, i128::MAX);
        assert_eq!(
            window.claim(Coin::new(1), penalty),
            Err(RewardError::Overflow("reward share"))
        );
        assert_eq!(window.meta().reward_pool, Coin::new(1000));
        assert_eq!(window.meta().window, Coin::new(10));
    }

    #[test]
    fn test_claim_zero_is_noop() {
        let mut window = window_with(1000, 0);
        assert_eq!(window.claim(Coin::ZERO, Rational::zero()).unwrap(), Coin::ZERO);
        assert_eq!(window.meta().reward_pool, Coin::new(1000));
    }

    #[test]
    fn test_claim_beyond_window_underflows() {
        let mut window = window_with(1000, 10);
        let err = window.claim(Coin::new(11), Rational::zero()).unwrap_err();
        assert_eq!(
            err,
            RewardError::WindowUnderflow {
                window: Coin::new(10),
                coin: Coin::new(11)
            }
        );
        assert_eq!(window.meta().reward_pool, Coin::new(1000));
        assert_eq!(window.meta().window, Coin::new(10));
    }

    #[test]
    fn test_fund_then_claim_conserves() {
        let mut window = window_with(0, 0);
        let mut scheduler = RecordingScheduler::default();
        window
            .fund_and_register(Coin::new(7), Coin::new(3), "reward", &mut scheduler, 1_000)
            .unwrap();
        assert_eq!(
            scheduler.registered,
            vec![(1_000 + DEFAULT_FREEZING_PERIOD_SECONDS, "reward")]
        );

        let reward = window.claim(Coin::new(3), Rational::zero()).unwrap();
        assert_eq!(reward, Coin::new(7));
        assert_eq!(window.meta().reward_pool, Coin::ZERO);
        assert_eq!(window.meta().window, Coin::ZERO);
    }

    #[test]
    fn test_failed_registration_leaves_window_untouched() {
        let mut window = window_with(10, 10);
        let mut scheduler = RecordingScheduler::default();
        let now = -10 * DEFAULT_FREEZING_PERIOD_SECONDS;
        let err = window
            .fund_and_register(Coin::new(1), Coin::new(1), "late", &mut scheduler, now)
            .unwrap_err();
        assert!(matches!(
            err,
            RewardError::Scheduling(SchedulingError::NegativeInstant(_))
        ));
        assert_eq!(window.meta().reward_pool, Coin::new(10));
        assert_eq!(window.meta().window, Coin::new(10));
    }

    #[test]
    fn test_friction_for_payment() {
        let window = ConsumptionRewardWindow::new(rational(5, 100), 60).unwrap();
        assert_eq!(window.friction_for(Coin::new(1_000)).unwrap(), Coin::new(50));
        assert_eq!(window.friction_for(Coin::new(19)).unwrap(), Coin::ZERO);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(ConsumptionRewardWindow::new(rational(3, 2), 60).is_err());
        assert!(ConsumptionRewardWindow::new(rational(1, 2), 0).is_err());

        let mut window = window_with(0, 0);
        assert!(window.set_freezing_period(-1).is_err());
        window.set_friction_rate(rational(1, 100)).unwrap();
        assert_eq!(window.friction_rate(), rational(1, 100));
    }
}
