//! Block-end event dispatch
//!
//! Released events are executed through an `EventExecutionRegistry`. Each
//! event runs against an `Overlay` of the store, so a failing event leaves no
//! partial writes behind while the rest of the batch goes ahead.

use crate::error::{AccountError, GlobalError, Result};
use crate::event::{
    ContentRewardEvent, Event, EventKind, ParamChangeEvent, ProposalDecideEvent, ReturnCoinEvent,
};
use crate::facade::GlobalState;
use cadence_core::{Coin, KvStore, Overlay};
use std::collections::BTreeMap;

/// Account balances live outside the engine
pub trait AccountLedger {
    fn add_balance(&mut self, account: &str, coin: Coin) -> std::result::Result<(), AccountError>;

    fn sub_balance(&mut self, account: &str, coin: Coin) -> std::result::Result<(), AccountError>;
}

/// In-memory account balances for tests and simulations
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    balances: BTreeMap<String, Coin>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &str) -> Coin {
        self.balances.get(account).copied().unwrap_or(Coin::ZERO)
    }

    /// Accounts with a recorded balance, in name order
    pub fn accounts(&self) -> impl Iterator<Item = (&str, Coin)> + '_ {
        self.balances
            .iter()
            .map(|(account, coin)| (account.as_str(), *coin))
    }
}

impl AccountLedger for MemoryLedger {
    fn add_balance(&mut self, account: &str, coin: Coin) -> std::result::Result<(), AccountError> {
        let current = self.balance(account);
        let updated = current.checked_add(coin).ok_or_else(|| AccountError::Rejected {
            account: account.to_string(),
            reason: format!("balance {} + {} overflows", current, coin),
        })?;
        self.balances.insert(account.to_string(), updated);
        Ok(())
    }

    fn sub_balance(&mut self, account: &str, coin: Coin) -> std::result::Result<(), AccountError> {
        let available = self.balance(account);
        let updated = available
            .checked_sub(coin)
            .ok_or_else(|| AccountError::InsufficientFunds {
                account: account.to_string(),
                requested: coin,
                available,
            })?;
        self.balances.insert(account.to_string(), updated);
        Ok(())
    }
}

/// One handler per event kind
pub trait EventExecutionRegistry {
    fn return_coin<S: KvStore>(
        &mut self,
        state: &mut GlobalState<S>,
        event: &ReturnCoinEvent,
    ) -> Result<()>;

    fn content_reward<S: KvStore>(
        &mut self,
        state: &mut GlobalState<S>,
        event: &ContentRewardEvent,
    ) -> Result<()>;

    fn proposal_decide<S: KvStore>(
        &mut self,
        state: &mut GlobalState<S>,
        event: &ProposalDecideEvent,
    ) -> Result<()>;

    fn param_change<S: KvStore>(
        &mut self,
        state: &mut GlobalState<S>,
        event: &ParamChangeEvent,
    ) -> Result<()> {
        state.apply_param_change(&event.change)
    }
}

pub fn execute<R, S>(registry: &mut R, state: &mut GlobalState<S>, event: &Event) -> Result<()>
where
    R: EventExecutionRegistry,
    S: KvStore,
{
    match event {
        Event::ReturnCoin(e) => registry.return_coin(state, e),
        Event::ContentReward(e) => registry.content_reward(state, e),
        Event::ProposalDecide(e) => registry.proposal_decide(state, e),
        Event::ParamChange(e) => registry.param_change(state, e),
    }
}

/// Registry that settles coin movements against an `AccountLedger`
pub struct LedgerExecutor<L: AccountLedger> {
    ledger: L,
    decided_proposals: Vec<String>,
}

impl<L: AccountLedger> LedgerExecutor<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            decided_proposals: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn into_ledger(self) -> L {
        self.ledger
    }

    /// Proposals whose voting period ended, for the governance module to tally
    pub fn decided_proposals(&self) -> &[String] {
        &self.decided_proposals
    }
}

impl<L: AccountLedger> EventExecutionRegistry for LedgerExecutor<L> {
    fn return_coin<S: KvStore>(
        &mut self,
        _state: &mut GlobalState<S>,
        event: &ReturnCoinEvent,
    ) -> Result<()> {
        self.ledger.add_balance(&event.account, event.amount)?;
        log::debug!(
            "Returned {} to {} ({:?})",
            event.amount,
            event.account,
            event.kind
        );
        Ok(())
    }

    fn content_reward<S: KvStore>(
        &mut self,
        state: &mut GlobalState<S>,
        event: &ContentRewardEvent,
    ) -> Result<()> {
        let reward = state.claim_reward(event.evaluated, event.penalty)?;
        if !reward.is_zero() {
            self.ledger.add_balance(&event.author, reward)?;
        }
        log::debug!(
            "Paid content reward {} to {} for post {}",
            reward,
            event.author,
            event.post_id
        );
        Ok(())
    }

    fn proposal_decide<S: KvStore>(
        &mut self,
        _state: &mut GlobalState<S>,
        event: &ProposalDecideEvent,
    ) -> Result<()> {
        self.decided_proposals.push(event.proposal_id.clone());
        Ok(())
    }
}

#[derive(Debug)]
pub struct SkippedEvent {
    pub event: Event,
    pub kind: EventKind,
    pub error: GlobalError,
}

#[derive(Debug, Default)]
pub struct DispatchReport {
    pub executed: usize,
    pub skipped: Vec<SkippedEvent>,
}

/// Execute released events in order, each in its own write scope.
///
/// An event that fails is skipped and its writes are discarded. Errors that
/// indicate corrupted state stop the batch and are returned.
pub fn dispatch_due<S, R>(
    state: &mut GlobalState<S>,
    registry: &mut R,
    events: Vec<Event>,
) -> Result<DispatchReport>
where
    S: KvStore,
    R: EventExecutionRegistry,
{
    let mut report = DispatchReport::default();
    let total = events.len();

    for (index, event) in events.into_iter().enumerate() {
        let mut scoped = GlobalState::new(Overlay::new(state.store_mut()))?;
        match execute(registry, &mut scoped, &event) {
            Ok(()) => {
                scoped.into_store().commit()?;
                report.executed += 1;
            }
            Err(err) if err.kind().halts_batch() => {
                log::error!(
                    "Halting dispatch at event {} of {} ({}): {}",
                    index + 1,
                    total,
                    event.kind().name(),
                    err
                );
                return Err(err);
            }
            Err(err) => {
                log::warn!(
                    "Skipping {} event (code {}): {}",
                    event.kind().name(),
                    err.code(),
                    err
                );
                report.skipped.push(SkippedEvent {
                    kind: event.kind(),
                    event,
                    error: err,
                });
            }
        }
    }

    if total > 0 {
        log::info!(
            "Dispatched {} events, {} skipped",
            report.executed,
            report.skipped.len()
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::event::{ParamChange, ReturnKind};
    use crate::genesis::GenesisParams;
    use crate::keys::CONSUMPTION_META_KEY;
    use cadence_core::{rational, MemoryStore, Rational};
    use num_traits::Zero;

    fn active_state() -> GlobalState<MemoryStore> {
        let mut state = GlobalState::new(MemoryStore::new()).unwrap();
        state
            .init(&GenesisParams {
                total_supply: Coin::from_whole(10_000),
                freezing_period_seconds: 60,
                ..GenesisParams::default()
            })
            .unwrap();
        state
    }

    fn refund(account: &str, amount: u64) -> Event {
        Event::ReturnCoin(ReturnCoinEvent {
            account: account.to_string(),
            amount: Coin::new(amount),
            kind: ReturnKind::ValidatorDeposit,
        })
    }

    fn reward(author: &str, evaluated: u64, penalty: Rational) -> Event {
        Event::ContentReward(ContentRewardEvent {
            author: author.to_string(),
            post_id: "post".to_string(),
            consumer: "reader".to_string(),
            original_payment: Coin::new(evaluated),
            friction: Coin::ZERO,
            evaluated: Coin::new(evaluated),
            penalty,
        })
    }

    #[test]
    fn test_memory_ledger_balances() {
        let mut ledger = MemoryLedger::new();
        ledger.add_balance("a", Coin::new(10)).unwrap();
        ledger.sub_balance("a", Coin::new(4)).unwrap();
        assert_eq!(ledger.balance("a"), Coin::new(6));

        let err = ledger.sub_balance("a", Coin::new(7)).unwrap_err();
        assert!(matches!(err, AccountError::InsufficientFunds { .. }));
        assert_eq!(ledger.balance("a"), Coin::new(6));
        assert_eq!(ledger.balance("nobody"), Coin::ZERO);
    }

    #[test]
    fn test_dispatch_executes_every_kind() {
        let mut state = active_state();
        state
            .register_content_reward(reward("alice", 10, Rational::zero()), Coin::new(1_000), Coin::new(10))
            .unwrap();

        let events = vec![
            refund("bob", 25),
            reward("alice", 10, rational(1, 2)),
            Event::ProposalDecide(ProposalDecideEvent {
                proposal_id: "42".to_string(),
            }),
            Event::ParamChange(ParamChangeEvent {
                change: ParamChange::FrictionRate(rational(2, 100)),
            }),
        ];

        let mut executor = LedgerExecutor::new(MemoryLedger::new());
        let report = dispatch_due(&mut state, &mut executor, events).unwrap();
        assert_eq!(report.executed, 4);
        assert!(report.skipped.is_empty());

        assert_eq!(executor.ledger().balance("bob"), Coin::new(25));
        // Whole window claimed at half penalty
        assert_eq!(executor.ledger().balance("alice"), Coin::new(500));
        assert_eq!(executor.decided_proposals().to_vec(), vec!["42".to_string()]);
        assert_eq!(state.friction_rate().unwrap(), rational(2, 100));

        let meta = state.consumption_meta().unwrap();
        assert_eq!(meta.reward_pool, Coin::new(500));
        assert!(meta.window.is_zero());
    }

    #[test]
    fn test_failed_event_is_skipped_and_rolled_back() {
        let mut state = active_state();
        state
            .register_content_reward(reward("alice", 5, Rational::zero()), Coin::new(100), Coin::new(5))
            .unwrap();
        let before = state.consumption_meta().unwrap();

        let events = vec![
            // Larger than the window
            reward("alice", 6, Rational::zero()),
            Event::ParamChange(ParamChangeEvent {
                change: ParamChange::FreezingPeriod(-1),
            }),
            refund("carol", 3),
        ];
        let mut executor = LedgerExecutor::new(MemoryLedger::new());
        let report = dispatch_due(&mut state, &mut executor, events).unwrap();

        assert_eq!(report.executed, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].kind, EventKind::ContentReward);
        assert_eq!(report.skipped[0].error.kind(), ErrorKind::WindowUnderflow);
        assert_eq!(report.skipped[1].error.kind(), ErrorKind::InvalidParameter);

        assert_eq!(state.consumption_meta().unwrap(), before);
        assert_eq!(executor.ledger().balance("alice"), Coin::ZERO);
        assert_eq!(executor.ledger().balance("carol"), Coin::new(3));
    }

    struct RejectingLedger;

    impl AccountLedger for RejectingLedger {
        fn add_balance(&mut self, account: &str, _coin: Coin) -> std::result::Result<(), AccountError> {
            Err(AccountError::Rejected {
                account: account.to_string(),
                reason: "frozen".to_string(),
            })
        }

        fn sub_balance(&mut self, account: &str, _coin: Coin) -> std::result::Result<(), AccountError> {
            Err(AccountError::Rejected {
                account: account.to_string(),
                reason: "frozen".to_string(),
            })
        }
    }

    #[test]
    fn test_claim_discarded_when_author_credit_fails() {
        let mut state = active_state();
        state
            .register_content_reward(reward("alice", 10, Rational::zero()), Coin::new(1_000), Coin::new(10))
            .unwrap();

        let mut executor = LedgerExecutor::new(RejectingLedger);
        let report = dispatch_due(
            &mut state,
            &mut executor,
            vec![reward("alice", 10, Rational::zero())],
        )
        .unwrap();

        assert_eq!(report.executed, 0);
        assert_eq!(report.skipped[0].error.kind(), ErrorKind::AccountRejected);
        let meta = state.consumption_meta().unwrap();
        assert_eq!(meta.reward_pool, Coin::new(1_000));
        assert_eq!(meta.window, Coin::new(10));
    }

    #[test]
    fn test_corruption_halts_batch() {
        let mut state = active_state();
        state.store_mut().delete(CONSUMPTION_META_KEY).unwrap();

        let mut executor = LedgerExecutor::new(MemoryLedger::new());
        let err = dispatch_due(
            &mut state,
            &mut executor,
            vec![
                refund("a", 1),
                reward("alice", 1, Rational::zero()),
                refund("b", 2),
            ],
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(executor.ledger().balance("a"), Coin::new(1));
        assert_eq!(executor.ledger().balance("b"), Coin::ZERO);
    }
}
