//! Cadence Global Engine
//!
//! Block-time driven state shared by every other module:
//! - Deferred events keyed by block time, released by `advance_block`
//! - The `GlobalState` facade over inflation, rewards, valuation and congestion
//! - Block-end dispatch of released events against an account ledger

pub mod dispatch;
pub mod error;
pub mod event;
pub mod facade;
pub mod genesis;
pub mod keys;
pub mod scheduler;

pub use dispatch::{
    dispatch_due, execute, AccountLedger, DispatchReport, EventExecutionRegistry, LedgerExecutor,
    MemoryLedger, SkippedEvent,
};
pub use error::{AccountError, ErrorKind, GlobalError, Result, Severity};
pub use event::{
    ContentRewardEvent, Event, EventKind, ParamChange, ParamChangeEvent, ProposalDecideEvent,
    ReturnCoinEvent, ReturnKind,
};
pub use facade::{BlockClock, GlobalSnapshot, GlobalState, Phase};
pub use genesis::GenesisParams;
pub use scheduler::EventStore;
