//! Deferred-event scheduling seam
//!
//! Components that need "run this N seconds from now" depend on the
//! `Scheduler` trait rather than on a concrete event store.

use crate::error::StoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Event instant {instant} is before the current block time {now}")]
    ExpiredEvent { instant: i64, now: i64 },

    #[error("Event instant {0} is negative")]
    NegativeInstant(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Accepts an event to be released once block time reaches `instant`.
pub trait Scheduler<E> {
    fn register_at(&mut self, instant: i64, event: E, now: i64) -> Result<(), SchedulingError>;
}

/// Reject instants that are negative or already behind `now`.
pub fn check_instant(instant: i64, now: i64) -> Result<(), SchedulingError> {
    if instant < 0 {
        return Err(SchedulingError::NegativeInstant(instant));
    }
    if instant < now {
        return Err(SchedulingError::ExpiredEvent { instant, now });
    }
    Ok(())
}
