//! Cadence Core Library
//!
//! Shared building blocks for the global economic engine:
//! - `Coin` and exact `Rational` arithmetic
//! - The key-value store boundary and its memory, overlay and sled backends
//! - The deferred-event scheduling seam

pub mod db;
pub mod error;
pub mod schedule;
pub mod store;
pub mod types;

pub use db::SledStore;
pub use error::StoreError;
pub use schedule::{check_instant, Scheduler, SchedulingError};
pub use store::{load_record, save_record, KvStore, MemoryStore, Overlay};
pub use types::{rational, rational_serde, rational_to_f64, Coin, Rational};

/// Chain-wide numeric constants
pub mod constants {
    /// Base units per whole coin (5 decimal places)
    pub const DECIMALS: u64 = 100_000;

    pub const SECONDS_PER_HOUR: i64 = 3_600;
    pub const SECONDS_PER_DAY: i64 = 86_400;

    /// Hourly payout periods in one inflation year
    pub const HOURS_PER_YEAR: i64 = 24 * 365;

    /// Monthly payout periods in one inflation year
    pub const MONTHS_PER_YEAR: i64 = 12;
}
