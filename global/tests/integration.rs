use cadence_core::constants::{DECIMALS, HOURS_PER_YEAR};
use cadence_core::{rational, Coin, KvStore, MemoryStore, Rational, SledStore};
use cadence_global::*;
use economics::PoolId;
use num_traits::Zero;

const GENESIS_TIME: i64 = 1_700_000_000;

fn genesis() -> GenesisParams {
    GenesisParams {
        total_supply: Coin::from_whole(10_000),
        freezing_period_seconds: 3_600,
        genesis_time: GENESIS_TIME,
        ..GenesisParams::default()
    }
}

fn init<S: KvStore>(store: S) -> GlobalState<S> {
    let mut state = GlobalState::new(store).expect("store is readable");
    state.init(&genesis()).expect("genesis is valid");
    state
}

fn content_reward(author: &str, evaluated: Coin, friction: Coin) -> Event {
    Event::ContentReward(ContentRewardEvent {
        author: author.to_string(),
        post_id: format!("{}-post", author),
        consumer: "reader".to_string(),
        original_payment: evaluated,
        friction,
        evaluated,
        penalty: Rational::zero(),
    })
}

/// Pay for content the way the post module would: evaluate, take friction,
/// fund the window and schedule the author's reward
fn pay_for_content<S: KvStore>(state: &mut GlobalState<S>, author: &str, payment: Coin) {
    let friction = payment
        .mul_rational(&state.friction_rate().unwrap())
        .unwrap();
    let evaluated = state.evaluate(payment, 1, 0, Coin::ZERO).unwrap();
    state
        .register_content_reward(content_reward(author, evaluated, friction), friction, evaluated)
        .unwrap();
    state.add_consumption(payment).unwrap();
}

#[test]
fn test_genesis_fixture_through_facade() {
    let state = init(MemoryStore::new());
    let pools = state.inflation_pools().unwrap();
    assert_eq!(pools.infra.units(), 196 * DECIMALS);
    assert_eq!(pools.content_creator.units(), 490 * DECIMALS);
    assert_eq!(pools.developer.units(), 196 * DECIMALS);
    assert_eq!(pools.validator.units(), 98 * DECIMALS);

    let clock = state.block_clock().unwrap();
    assert_eq!(clock.genesis_time, GENESIS_TIME);
    assert_eq!(clock.height, None);
    assert_eq!(state.capacity_ratio().unwrap(), Rational::zero());
}

#[test]
fn test_content_rewards_conserve_the_pool() {
    let mut state = init(MemoryStore::new());
    pay_for_content(&mut state, "alice", Coin::from_whole(100));
    pay_for_content(&mut state, "bob", Coin::from_whole(300));

    let meta = state.consumption_meta().unwrap();
    let funded_pool = meta.reward_pool;
    assert_eq!(funded_pool, Coin::from_whole(20), "5% friction on 400 coins");

    // Nothing is claimable before the freezing period ends
    let released = state.advance_block(1, GENESIS_TIME + 3_599, 10).unwrap();
    assert!(released.is_empty());

    let released = state.advance_block(2, GENESIS_TIME + 3_600, 10).unwrap();
    assert_eq!(released.len(), 2);

    let mut executor = LedgerExecutor::new(MemoryLedger::new());
    let report = dispatch_due(&mut state, &mut executor, released).unwrap();
    assert_eq!(report.executed, 2);

    let alice = executor.ledger().balance("alice");
    let bob = executor.ledger().balance("bob");
    assert!(bob > alice, "larger payment earns the larger share");

    let meta = state.consumption_meta().unwrap();
    assert!(meta.window.is_zero());
    let paid = alice.checked_add(bob).unwrap();
    assert_eq!(
        paid.checked_add(meta.reward_pool).unwrap(),
        funded_pool,
        "rewards plus truncation dust equal the funded pool"
    );
}

#[test]
fn test_hourly_inflation_and_annual_recalculation() {
    let mut state = init(MemoryStore::new());
    let seeded = state.inflation_pools().unwrap().content_creator;
    let supply = state.global_meta().unwrap().total_supply;

    let mut distributed = Coin::ZERO;
    for hour in 1..=HOURS_PER_YEAR {
        let paid = state.distribute_content_inflation(hour).unwrap();
        distributed = distributed.checked_add(paid).unwrap();
    }
    assert_eq!(distributed, seeded);
    assert!(state.inflation_pools().unwrap().content_creator.is_zero());
    assert_eq!(state.consumption_meta().unwrap().reward_pool, seeded);
    assert_eq!(
        state.global_meta().unwrap().total_supply,
        supply.checked_add(seeded).unwrap()
    );

    for month in 1..=12 {
        state.payout_periodic(PoolId::Validator, month, 12).unwrap();
    }
    assert!(state.inflation_pools().unwrap().validator.is_zero());

    state.add_consumption(Coin::from_whole(1_000)).unwrap();
    state.recalculate_annual().unwrap();
    state.add_consumption(Coin::from_whole(1_031)).unwrap();
    state.recalculate_annual().unwrap();
    assert_eq!(state.global_meta().unwrap().growth_rate, rational(31, 1000));
    assert!(!state.inflation_pools().unwrap().content_creator.is_zero());
}

#[test]
fn test_deposit_returns_in_instalments() {
    let mut state = init(MemoryStore::new());
    let day = 86_400;
    for week in 1..=4 {
        state
            .register_event_after(
                week * 7 * day,
                Event::ReturnCoin(ReturnCoinEvent {
                    account: "validator-1".to_string(),
                    amount: Coin::from_whole(250),
                    kind: ReturnKind::ValidatorDeposit,
                }),
            )
            .unwrap();
    }
    assert_eq!(state.pending_events(10).unwrap().len(), 4);

    let mut executor = LedgerExecutor::new(MemoryLedger::new());
    let mut height = 0;
    for time in [GENESIS_TIME + 10 * day, GENESIS_TIME + 22 * day, GENESIS_TIME + 40 * day] {
        height += 1;
        let released = state.advance_block(height, time, 0).unwrap();
        dispatch_due(&mut state, &mut executor, released).unwrap();
    }

    assert_eq!(
        executor.ledger().balance("validator-1"),
        Coin::from_whole(1_000)
    );
    assert!(state.pending_events(10).unwrap().is_empty());
}

#[test]
fn test_governance_param_change_event() {
    let mut state = init(MemoryStore::new());
    state
        .register_event_after(
            600,
            Event::ParamChange(ParamChangeEvent {
                change: ParamChange::FrictionRate(rational(1, 100)),
            }),
        )
        .unwrap();
    state
        .register_event_after(
            600,
            Event::ProposalDecide(ProposalDecideEvent {
                proposal_id: "p-9".to_string(),
            }),
        )
        .unwrap();

    let released = state.advance_block(1, GENESIS_TIME + 600, 0).unwrap();
    assert_eq!(released[0].kind(), EventKind::ParamChange);
    assert_eq!(released[1].kind(), EventKind::ProposalDecide);

    let mut executor = LedgerExecutor::new(MemoryLedger::new());
    dispatch_due(&mut state, &mut executor, released).unwrap();
    assert_eq!(state.friction_rate().unwrap(), rational(1, 100));
    assert_eq!(executor.decided_proposals().to_vec(), vec!["p-9".to_string()]);
}

#[test]
fn test_sled_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("global");

    let hash = {
        let mut state = init(SledStore::open(&path).unwrap());
        pay_for_content(&mut state, "alice", Coin::from_whole(50));
        state.advance_block(1, GENESIS_TIME + 1, 5).unwrap();
        state.store_mut().flush().unwrap();
        state.state_hash().unwrap()
    };

    let mut state = GlobalState::new(SledStore::open(&path).unwrap()).unwrap();
    assert_eq!(state.phase(), Phase::Active);
    assert_eq!(state.state_hash().unwrap(), hash);
    assert_eq!(state.block_clock().unwrap().height, Some(1));
    assert!(matches!(
        state.init(&genesis()),
        Err(GlobalError::AlreadyInitialized)
    ));

    let released = state.advance_block(2, GENESIS_TIME + 3_601, 0).unwrap();
    assert_eq!(released.len(), 1);
}

#[test]
fn test_backends_agree_on_state_hash() {
    let dir = tempfile::tempdir().unwrap();
    let mut on_disk = init(SledStore::open(dir.path().join("db")).unwrap());
    let mut in_memory = init(MemoryStore::new());

    run_blocks(&mut on_disk);
    run_blocks(&mut in_memory);
    assert_eq!(
        on_disk.state_hash().unwrap(),
        in_memory.state_hash().unwrap()
    );
}

/// Same block sequence applied to any backend
fn run_blocks<S: KvStore>(state: &mut GlobalState<S>) {
    pay_for_content(state, "carol", Coin::from_whole(10));
    state
        .register_event_after(
            5,
            Event::ProposalDecide(ProposalDecideEvent {
                proposal_id: "1".to_string(),
            }),
        )
        .unwrap();
    state.advance_block(1, GENESIS_TIME + 2, 7).unwrap();
    state.advance_block(2, GENESIS_TIME + 5, 3).unwrap();
}
