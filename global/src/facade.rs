//! Global state facade
//!
//! The only entry point other modules use. Owns every engine record in the
//! injected store, enforces the `Uninitialized → Active` lifecycle, and runs
//! the per-block hook that releases due events.

use crate::error::{GlobalError, Result};
use crate::event::{Event, ParamChange};
use crate::genesis::GenesisParams;
use crate::keys::{
    ALLOCATION_KEY, BLOCK_CLOCK_KEY, CONGESTION_KEY, CONSUMPTION_META_KEY, EVENT_PREFIX,
    GLOBAL_META_KEY, INFLATION_POOLS_KEY, RECORD_KEYS, VALUATION_PARAMS_KEY,
};
use crate::scheduler::{self, EventStore};
use cadence_core::constants::{HOURS_PER_YEAR, SECONDS_PER_HOUR};
use cadence_core::{load_record, rational_serde, save_record, Coin, KvStore, Rational};
use economics::{
    valuation, CongestionMeter, CongestionState, ConsumptionMeta, ConsumptionRewardWindow,
    ContentValuationParams, GlobalAllocation, GlobalMeta, InflationLedger, InflationPools,
    PoolId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Active,
}

/// Block height and time as last seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockClock {
    pub genesis_time: i64,
    pub last_block_time: i64,
    /// `None` until the first block after genesis
    pub height: Option<u64>,
}

impl BlockClock {
    pub fn elapsed_seconds(&self) -> i64 {
        self.last_block_time - self.genesis_time
    }

    pub fn past_hours(&self) -> i64 {
        self.elapsed_seconds() / SECONDS_PER_HOUR
    }
}

/// Read-only view of every record, for operators and query tooling
#[derive(Debug, Clone, Serialize)]
pub struct GlobalSnapshot {
    pub clock: BlockClock,
    pub meta: GlobalMeta,
    pub pools: InflationPools,
    pub allocation: GlobalAllocation,
    pub consumption: ConsumptionMeta,
    pub congestion: CongestionState,
    #[serde(with = "rational_serde")]
    pub capacity_ratio: Rational,
    pub valuation_params: ContentValuationParams,
    pub scheduled_instants: usize,
}

pub struct GlobalState<S: KvStore> {
    store: S,
    phase: Phase,
}

impl<S: KvStore> GlobalState<S> {
    /// Attach to a store; the engine is active if genesis was already written
    pub fn new(store: S) -> Result<Self> {
        let phase = if store.get(BLOCK_CLOCK_KEY)?.is_some() {
            Phase::Active
        } else {
            Phase::Uninitialized
        };
        Ok(Self { store, phase })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Write every record from validated genesis parameters
    pub fn init(&mut self, genesis: &GenesisParams) -> Result<()> {
        if self.phase == Phase::Active {
            return Err(GlobalError::AlreadyInitialized);
        }
        genesis.validate()?;

        let ledger = InflationLedger::init(
            genesis.total_supply,
            genesis.default_growth_rate,
            genesis.floor,
            genesis.ceiling,
            genesis.allocation(),
        )
        .map_err(|e| GlobalError::InvalidGenesisConfig(e.to_string()))?;
        let window =
            ConsumptionRewardWindow::new(genesis.friction_rate, genesis.freezing_period_seconds)
                .map_err(|e| GlobalError::InvalidGenesisConfig(e.to_string()))?;
        let meter = CongestionMeter::new(genesis.max_tps_seed);
        let clock = BlockClock {
            genesis_time: genesis.genesis_time,
            last_block_time: genesis.genesis_time,
            height: None,
        };

        self.save_ledger(ledger)?;
        self.save(CONSUMPTION_META_KEY, window.meta())?;
        self.save(CONGESTION_KEY, meter.state())?;
        self.save(VALUATION_PARAMS_KEY, &genesis.evaluation_params)?;
        self.save(BLOCK_CLOCK_KEY, &clock)?;
        self.store.flush()?;
        self.phase = Phase::Active;

        log::info!(
            "Global state initialized: supply {}, growth {}, genesis time {}",
            genesis.total_supply,
            genesis.default_growth_rate,
            genesis.genesis_time
        );
        Ok(())
    }

    /// Per-block hook: update the congestion meter and release every event
    /// scheduled at or before `time`. The caller dispatches the result.
    pub fn advance_block(&mut self, height: u64, time: i64, tx_count: i64) -> Result<Vec<Event>> {
        self.ensure_active()?;
        let mut clock = self.block_clock()?;

        let height_ok = clock.height.map_or(true, |last| height > last);
        if !height_ok || time < clock.last_block_time {
            return Err(GlobalError::BlockOutOfOrder {
                height,
                time,
                last_height: clock.height,
                last_time: clock.last_block_time,
            });
        }

        let mut meter = CongestionMeter::from_state(self.load(CONGESTION_KEY, "congestion")?);
        meter.update(tx_count, time, clock.last_block_time);

        let released = EventStore::new(&mut self.store).take_all_due(time)?;

        clock.height = Some(height);
        clock.last_block_time = time;
        self.save(CONGESTION_KEY, meter.state())?;
        self.save(BLOCK_CLOCK_KEY, &clock)?;

        if released.is_empty() {
            log::debug!("Block {} at {}: no deferred events due", height, time);
        } else {
            log::info!(
                "Block {} at {}: released {} deferred events",
                height,
                time,
                released.len()
            );
        }
        Ok(released)
    }

    /// Schedule `event` for block time `instant`
    pub fn register_event_at(&mut self, instant: i64, event: Event) -> Result<()> {
        self.ensure_active()?;
        let now = self.block_clock()?.last_block_time;
        EventStore::new(&mut self.store).register_at(instant, event, now)?;
        Ok(())
    }

    /// Schedule `event` `delay_seconds` after the last block time
    pub fn register_event_after(&mut self, delay_seconds: i64, event: Event) -> Result<()> {
        self.ensure_active()?;
        let now = self.block_clock()?.last_block_time;
        let instant = now.saturating_add(delay_seconds);
        EventStore::new(&mut self.store).register_at(instant, event, now)?;
        Ok(())
    }

    /// Fund the reward window from a payment and schedule the author's
    /// reward event for the end of the freezing period
    pub fn register_content_reward(
        &mut self,
        event: Event,
        friction: Coin,
        evaluated: Coin,
    ) -> Result<()> {
        self.ensure_active()?;
        let now = self.block_clock()?.last_block_time;
        let mut window = self.consumption_window()?;

        window.fund_and_register(
            friction,
            evaluated,
            event,
            &mut EventStore::new(&mut self.store),
            now,
        )?;
        self.save(CONSUMPTION_META_KEY, window.meta())
    }

    pub fn claim_reward(&mut self, coin: Coin, penalty: Rational) -> Result<Coin> {
        self.ensure_active()?;
        let mut window = self.consumption_window()?;
        let reward = window.claim(coin, penalty)?;
        self.save(CONSUMPTION_META_KEY, window.meta())?;
        Ok(reward)
    }

    pub fn capacity_ratio(&self) -> Result<Rational> {
        self.ensure_active()?;
        Ok(CongestionMeter::from_state(self.congestion()?).capacity_ratio())
    }

    pub fn payout_periodic(
        &mut self,
        pool: PoolId,
        periods_elapsed: i64,
        periods_per_year: i64,
    ) -> Result<Coin> {
        self.ensure_active()?;
        let mut ledger = self.inflation_ledger()?;
        let amount = ledger.payout_periodic(pool, periods_elapsed, periods_per_year)?;
        self.save_ledger(ledger)?;
        Ok(amount)
    }

    /// Annual growth-rate update from the consumption recorded this year
    pub fn recalculate_annual(&mut self) -> Result<()> {
        self.ensure_active()?;
        let mut ledger = self.inflation_ledger()?;
        let cumulative = ledger.meta().cumulative_consumption;
        ledger.recalculate_annual(cumulative)?;
        self.save_ledger(ledger)
    }

    pub fn evaluate(
        &self,
        coin: Coin,
        count: i64,
        elapsed: i64,
        total_reward: Coin,
    ) -> Result<Coin> {
        self.ensure_active()?;
        let params = self.valuation_params()?;
        Ok(valuation::evaluate(coin, count, elapsed, total_reward, &params))
    }

    pub fn add_consumption(&mut self, coin: Coin) -> Result<()> {
        self.ensure_active()?;
        if coin.is_zero() {
            return Ok(());
        }
        let mut ledger = self.inflation_ledger()?;
        ledger.add_consumption(coin)?;
        self.save_ledger(ledger)
    }

    pub fn friction_rate(&self) -> Result<Rational> {
        self.ensure_active()?;
        Ok(self.consumption_window()?.friction_rate())
    }

    /// Move one hour of content-creator inflation into the reward pool
    pub fn distribute_content_inflation(&mut self, hours_elapsed: i64) -> Result<Coin> {
        self.ensure_active()?;
        let mut ledger = self.inflation_ledger()?;
        let mut window = self.consumption_window()?;

        let amount = ledger.payout_periodic(PoolId::ContentCreator, hours_elapsed, HOURS_PER_YEAR)?;
        window.fund_pool(amount)?;

        self.save_ledger(ledger)?;
        self.save(CONSUMPTION_META_KEY, window.meta())?;
        Ok(amount)
    }

    pub fn apply_param_change(&mut self, change: &ParamChange) -> Result<()> {
        self.ensure_active()?;
        match change {
            ParamChange::Valuation(params) => {
                params.validate().map_err(GlobalError::InvalidParamChange)?;
                self.save(VALUATION_PARAMS_KEY, params)?;
            }
            ParamChange::FrictionRate(rate) => {
                let mut window = self.consumption_window()?;
                window.set_friction_rate(*rate)?;
                self.save(CONSUMPTION_META_KEY, window.meta())?;
            }
            ParamChange::FreezingPeriod(seconds) => {
                let mut window = self.consumption_window()?;
                window.set_freezing_period(*seconds)?;
                self.save(CONSUMPTION_META_KEY, window.meta())?;
            }
            ParamChange::Allocation(allocation) => {
                let mut ledger = self.inflation_ledger()?;
                ledger.set_allocation(allocation.clone())?;
                self.save_ledger(ledger)?;
            }
            ParamChange::GrowthBounds { floor, ceiling } => {
                let mut ledger = self.inflation_ledger()?;
                ledger.set_growth_bounds(*floor, *ceiling)?;
                self.save_ledger(ledger)?;
            }
        }
        log::info!("Applied {} parameter change", change.name());
        Ok(())
    }

    pub fn global_meta(&self) -> Result<GlobalMeta> {
        self.ensure_active()?;
        self.load(GLOBAL_META_KEY, "global meta")
    }

    pub fn inflation_pools(&self) -> Result<InflationPools> {
        self.ensure_active()?;
        self.load(INFLATION_POOLS_KEY, "inflation pools")
    }

    pub fn allocation(&self) -> Result<GlobalAllocation> {
        self.ensure_active()?;
        self.load(ALLOCATION_KEY, "global allocation")
    }

    pub fn consumption_meta(&self) -> Result<ConsumptionMeta> {
        self.ensure_active()?;
        self.load(CONSUMPTION_META_KEY, "consumption meta")
    }

    pub fn congestion(&self) -> Result<CongestionState> {
        self.ensure_active()?;
        self.load(CONGESTION_KEY, "congestion")
    }

    pub fn valuation_params(&self) -> Result<ContentValuationParams> {
        self.ensure_active()?;
        self.load(VALUATION_PARAMS_KEY, "valuation params")
    }

    pub fn block_clock(&self) -> Result<BlockClock> {
        self.ensure_active()?;
        self.load(BLOCK_CLOCK_KEY, "block clock")
    }

    pub fn peek_events(&self, instant: i64) -> Result<Vec<Event>> {
        self.ensure_active()?;
        Ok(scheduler::peek(&self.store, instant)?)
    }

    pub fn pending_events(&self, limit: usize) -> Result<Vec<(i64, Vec<Event>)>> {
        self.ensure_active()?;
        Ok(scheduler::pending(&self.store, limit)?)
    }

    pub fn snapshot(&self) -> Result<GlobalSnapshot> {
        let congestion = self.congestion()?;
        let capacity_ratio = CongestionMeter::from_state(congestion.clone()).capacity_ratio();
        Ok(GlobalSnapshot {
            clock: self.block_clock()?,
            meta: self.global_meta()?,
            pools: self.inflation_pools()?,
            allocation: self.allocation()?,
            consumption: self.consumption_meta()?,
            congestion,
            capacity_ratio,
            valuation_params: self.valuation_params()?,
            scheduled_instants: self.store.scan_prefix(EVENT_PREFIX)?.len(),
        })
    }

    /// SHA-256 over every engine record in key order. Nodes that processed
    /// the same blocks must report the same hash.
    pub fn state_hash(&self) -> Result<String> {
        self.ensure_active()?;
        let mut hasher = Sha256::new();

        let mut absorb = |key: &[u8], value: &[u8]| {
            hasher.update((key.len() as u32).to_le_bytes());
            hasher.update(key);
            hasher.update((value.len() as u32).to_le_bytes());
            hasher.update(value);
        };

        for key in RECORD_KEYS {
            let value = self
                .store
                .get(key)?
                .ok_or_else(|| GlobalError::NotFound(String::from_utf8_lossy(key).into_owned()))?;
            absorb(key, &value);
        }
        for (key, value) in self.store.scan_prefix(EVENT_PREFIX)? {
            absorb(&key, &value);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    fn ensure_active(&self) -> Result<()> {
        match self.phase {
            Phase::Active => Ok(()),
            Phase::Uninitialized => Err(GlobalError::NotInitialized),
        }
    }

    fn load<T: DeserializeOwned>(&self, key: &[u8], name: &str) -> Result<T> {
        load_record(&self.store, key)?.ok_or_else(|| GlobalError::NotFound(name.to_string()))
    }

    fn save<T: Serialize>(&mut self, key: &[u8], record: &T) -> Result<()> {
        save_record(&mut self.store, key, record)?;
        Ok(())
    }

    fn inflation_ledger(&self) -> Result<InflationLedger> {
        Ok(InflationLedger::from_parts(
            self.load(GLOBAL_META_KEY, "global meta")?,
            self.load(INFLATION_POOLS_KEY, "inflation pools")?,
            self.load(ALLOCATION_KEY, "global allocation")?,
        ))
    }

    fn save_ledger(&mut self, ledger: InflationLedger) -> Result<()> {
        let (meta, pools, allocation) = ledger.into_parts();
        self.save(GLOBAL_META_KEY, &meta)?;
        self.save(INFLATION_POOLS_KEY, &pools)?;
        self.save(ALLOCATION_KEY, &allocation)
    }

    fn consumption_window(&self) -> Result<ConsumptionRewardWindow> {
        Ok(ConsumptionRewardWindow::from_meta(
            self.load(CONSUMPTION_META_KEY, "consumption meta")?,
        ))
    }
}
