//! Economics error types

use crate::inflation::PoolId;
use cadence_core::{Coin, SchedulingError};
use thiserror::Error;

/// Inflation ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient {pool} pool balance: requested {requested}, available {available}")]
    InsufficientFunds {
        pool: PoolId,
        requested: Coin,
        available: Coin,
    },

    #[error("No payout periods left: elapsed {elapsed} of {periods_per_year}")]
    DivideByZeroPeriod { elapsed: i64, periods_per_year: i64 },

    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("Invalid growth bounds: {0}")]
    InvalidGrowthBounds(String),

    #[error("Coin arithmetic overflow in {0}")]
    Overflow(&'static str),
}

/// Consumption reward window errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("Evaluation window underflow: window {window}, claimed {coin}")]
    WindowUnderflow { window: Coin, coin: Coin },

    #[error("Penalty {0} is outside [0, 1]")]
    InvalidPenalty(String),

    #[error("Invalid consumption parameter: {0}")]
    InvalidParameter(String),

    #[error("Coin arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
pub type RewardResult<T> = std::result::Result<T, RewardError>;
