//! Engine error types
//!
//! `GlobalError` wraps the store, scheduling and economics errors with their
//! original value as `source()`. `ErrorKind` flattens the chain into a stable
//! code and a severity for transaction results and block processing.

use cadence_core::{Coin, SchedulingError, StoreError};
use economics::{LedgerError, RewardError};
use thiserror::Error;

/// Failures reported by the external account ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: String,
        requested: Coin,
        available: Coin,
    },

    #[error("Account {account} rejected the update: {reason}")]
    Rejected { account: String, reason: String },
}

#[derive(Error, Debug)]
pub enum GlobalError {
    #[error("Global state is not initialized")]
    NotInitialized,

    #[error("Global state is already initialized")]
    AlreadyInitialized,

    #[error("Required record missing: {0}")]
    NotFound(String),

    #[error("Invalid genesis config: {0}")]
    InvalidGenesisConfig(String),

    #[error("Invalid parameter change: {0}")]
    InvalidParamChange(String),

    #[error(
        "Block out of order: height {height} at {time} after height {last_height:?} at {last_time}"
    )]
    BlockOutOfOrder {
        height: u64,
        time: i64,
        last_height: Option<u64>,
        last_time: i64,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("Inflation ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Reward window error: {0}")]
    Reward(#[from] RewardError),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),
}

pub type Result<T> = std::result::Result<T, GlobalError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Aborts only the transaction or event that raised it
    Recoverable,
    /// Needs operator intervention
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotInitialized,
    AlreadyInitialized,
    NotFound,
    MarshalError,
    UnmarshalError,
    StoreBackend,
    ExpiredEvent,
    InvalidInstant,
    InsufficientFunds,
    WindowUnderflow,
    DivideByZeroPeriod,
    InvalidGenesisConfig,
    InvalidParameter,
    BlockOutOfOrder,
    Overflow,
    AccountRejected,
}

impl ErrorKind {
    /// Stable code surfaced in transaction results
    pub fn code(self) -> u16 {
        match self {
            ErrorKind::NotInitialized => 100,
            ErrorKind::AlreadyInitialized => 101,
            ErrorKind::InvalidGenesisConfig => 102,
            ErrorKind::BlockOutOfOrder => 103,
            ErrorKind::NotFound => 200,
            ErrorKind::MarshalError => 201,
            ErrorKind::UnmarshalError => 202,
            ErrorKind::StoreBackend => 203,
            ErrorKind::ExpiredEvent => 300,
            ErrorKind::InvalidInstant => 301,
            ErrorKind::InsufficientFunds => 400,
            ErrorKind::WindowUnderflow => 401,
            ErrorKind::DivideByZeroPeriod => 402,
            ErrorKind::Overflow => 403,
            ErrorKind::InvalidParameter => 404,
            ErrorKind::AccountRejected => 500,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            ErrorKind::NotFound
            | ErrorKind::MarshalError
            | ErrorKind::UnmarshalError
            | ErrorKind::StoreBackend
            | ErrorKind::DivideByZeroPeriod => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }

    pub fn is_fatal(self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// State corruption: stop processing the rest of a deferred-event batch
    pub fn halts_batch(self) -> bool {
        matches!(
            self,
            ErrorKind::NotFound | ErrorKind::UnmarshalError | ErrorKind::StoreBackend
        )
    }
}

fn store_kind(err: &StoreError) -> ErrorKind {
    match err {
        StoreError::Backend(_) => ErrorKind::StoreBackend,
        StoreError::Marshal(_) => ErrorKind::MarshalError,
        StoreError::Unmarshal(_) => ErrorKind::UnmarshalError,
    }
}

fn scheduling_kind(err: &SchedulingError) -> ErrorKind {
    match err {
        SchedulingError::ExpiredEvent { .. } => ErrorKind::ExpiredEvent,
        SchedulingError::NegativeInstant(_) => ErrorKind::InvalidInstant,
        SchedulingError::Store(e) => store_kind(e),
    }
}

impl GlobalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GlobalError::NotInitialized => ErrorKind::NotInitialized,
            GlobalError::AlreadyInitialized => ErrorKind::AlreadyInitialized,
            GlobalError::NotFound(_) => ErrorKind::NotFound,
            GlobalError::InvalidGenesisConfig(_) => ErrorKind::InvalidGenesisConfig,
            GlobalError::InvalidParamChange(_) => ErrorKind::InvalidParameter,
            GlobalError::BlockOutOfOrder { .. } => ErrorKind::BlockOutOfOrder,
            GlobalError::Store(e) => store_kind(e),
            GlobalError::Scheduling(e) => scheduling_kind(e),
            GlobalError::Ledger(e) => match e {
                LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
                LedgerError::DivideByZeroPeriod { .. } => ErrorKind::DivideByZeroPeriod,
                LedgerError::InvalidAllocation(_) | LedgerError::InvalidGrowthBounds(_) => {
                    ErrorKind::InvalidParameter
                }
                LedgerError::Overflow(_) => ErrorKind::Overflow,
            },
            GlobalError::Reward(e) => match e {
                RewardError::WindowUnderflow { .. } => ErrorKind::WindowUnderflow,
                RewardError::InvalidPenalty(_) | RewardError::InvalidParameter(_) => {
                    ErrorKind::InvalidParameter
                }
                RewardError::Overflow(_) => ErrorKind::Overflow,
                RewardError::Scheduling(e) => scheduling_kind(e),
            },
            GlobalError::Account(e) => match e {
                AccountError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
                AccountError::Rejected { .. } => ErrorKind::AccountRejected,
            },
        }
    }

    pub fn code(&self) -> u16 {
        self.kind().code()
    }
}
