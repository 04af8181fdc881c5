//! Subcommand handlers for `cadenced`

use crate::accounts;
use anyhow::{anyhow, bail, Context, Result};
use cadence_core::constants::DECIMALS;
use cadence_core::{Coin, KvStore, Overlay, SledStore};
use cadence_global::{
    dispatch_due, Event, GenesisParams, GlobalState, LedgerExecutor, Phase, ReturnCoinEvent,
    ReturnKind,
};
use owo_colors::OwoColorize;
use std::path::Path;

fn open_store(data_dir: &Path) -> Result<SledStore> {
    SledStore::open(data_dir)
        .with_context(|| format!("opening state database at {}", data_dir.display()))
}

pub fn open_state(data_dir: &Path) -> Result<GlobalState<SledStore>> {
    Ok(GlobalState::new(open_store(data_dir)?)?)
}

fn ensure_active<S: KvStore>(state: &GlobalState<S>, data_dir: &Path) -> Result<()> {
    if state.phase() != Phase::Active {
        bail!(
            "no global state in {}; run `cadenced init` first",
            data_dir.display()
        );
    }
    Ok(())
}

fn open_active(data_dir: &Path) -> Result<GlobalState<SledStore>> {
    let state = open_state(data_dir)?;
    ensure_active(&state, data_dir)?;
    Ok(state)
}

/// Unix seconds, or an RFC 3339 timestamp
pub fn parse_block_time(value: &str) -> Result<i64> {
    if let Ok(seconds) = value.parse::<i64>() {
        return Ok(seconds);
    }
    let time = chrono::DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("`{}` is neither Unix seconds nor RFC 3339", value))?;
    Ok(time.timestamp())
}

/// Decimal coin amount with up to five fractional digits, e.g. `12.5`
pub fn parse_coin(value: &str) -> Result<Coin> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if fraction.len() > 5 {
        bail!("`{}` has more than 5 decimal places", value);
    }
    let whole: u64 = whole
        .parse()
        .with_context(|| format!("invalid coin amount `{}`", value))?;
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<5}", fraction)
            .parse()
            .with_context(|| format!("invalid coin amount `{}`", value))?
    };
    whole
        .checked_mul(DECIMALS)
        .and_then(|units| units.checked_add(fraction))
        .map(Coin::new)
        .ok_or_else(|| anyhow!("coin amount `{}` is too large", value))
}

fn format_time(seconds: i64) -> String {
    chrono::DateTime::from_timestamp(seconds, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| seconds.to_string())
}

pub fn init(data_dir: &Path, genesis_path: Option<&Path>) -> Result<()> {
    let genesis = match genesis_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading genesis file {}", path.display()))?;
            GenesisParams::from_json(&json)?
        }
        None => GenesisParams::default(),
    };

    let mut state = open_state(data_dir)?;
    state.init(&genesis)?;

    println!("{}", "Global state initialized".green().bold());
    println!("  {}: {}", "Data dir".yellow(), data_dir.display());
    println!("  {}: {}", "Genesis time".yellow(), format_time(genesis.genesis_time));
    println!("  {}: {}", "Total supply".yellow(), genesis.total_supply);
    println!("  {}: {}", "Growth rate".yellow(), genesis.default_growth_rate);

    let pools = state.inflation_pools()?;
    println!("\n{}", "Inflation pools".yellow().bold());
    println!("  infra            {}", pools.infra);
    println!("  content_creator  {}", pools.content_creator);
    println!("  developer        {}", pools.developer);
    println!("  validator        {}", pools.validator);
    Ok(())
}

/// Apply one block. Nothing reaches disk unless the whole block succeeds.
pub fn advance(data_dir: &Path, height: u64, time: &str, tx_count: i64) -> Result<()> {
    let time = parse_block_time(time)?;
    let mut store = open_store(data_dir)?;
    let before = accounts::load_ledger(&store)?;

    let mut state = GlobalState::new(Overlay::new(&mut store))?;
    ensure_active(&state, data_dir)?;
    let released = state.advance_block(height, time, tx_count)?;
    let mut executor = LedgerExecutor::new(before.clone());
    let report = dispatch_due(&mut state, &mut executor, released)?;
    accounts::save_ledger(state.store_mut(), executor.ledger())?;
    let capacity = state.capacity_ratio()?;
    state.into_store().commit()?.flush()?;

    println!(
        "Block {} at {}: {} events executed, {} skipped, capacity ratio {}",
        height.to_string().bright_blue(),
        format_time(time),
        report.executed.to_string().green(),
        report.skipped.len(),
        capacity
    );
    for (account, balance) in executor.ledger().accounts() {
        if balance != before.balance(account) {
            println!("  balance {} {}", account, balance.to_string().green());
        }
    }
    for proposal in executor.decided_proposals() {
        println!("  proposal {} ready for tally", proposal);
    }
    for skipped in &report.skipped {
        println!(
            "  {} {} event skipped: {}",
            "⚠".yellow(),
            skipped.kind.name(),
            skipped.error
        );
    }
    Ok(())
}

pub fn schedule_return(
    data_dir: &Path,
    account: &str,
    amount: &str,
    delay: i64,
    kind: ReturnKind,
) -> Result<()> {
    let amount = parse_coin(amount)?;
    let mut state = open_active(data_dir)?;
    let event = Event::ReturnCoin(ReturnCoinEvent {
        account: account.to_string(),
        amount,
        kind,
    });
    state.register_event_after(delay, event)?;
    state.store_mut().flush()?;

    let due = state.block_clock()?.last_block_time + delay;
    println!(
        "Scheduled return of {} to {} at {}",
        amount.to_string().green(),
        account,
        format_time(due)
    );
    Ok(())
}

pub fn show(data_dir: &Path) -> Result<()> {
    let state = open_active(data_dir)?;
    let snapshot = state.snapshot()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub fn events(data_dir: &Path, limit: usize) -> Result<()> {
    let state = open_active(data_dir)?;
    let pending = state.pending_events(limit)?;
    if pending.is_empty() {
        println!("No scheduled events");
        return Ok(());
    }

    for (instant, events) in pending {
        println!("{} ({})", format_time(instant).bright_blue(), instant);
        for event in events {
            println!("  {:<16} {}", event.kind().name(), hex::encode(event.encode()?));
        }
    }
    Ok(())
}

pub fn balances(data_dir: &Path) -> Result<()> {
    let state = open_active(data_dir)?;
    let ledger = accounts::load_ledger(state.store())?;
    let mut empty = true;
    for (account, balance) in ledger.accounts() {
        println!("{:<24} {}", account, balance);
        empty = false;
    }
    if empty {
        println!("No account balances");
    }
    Ok(())
}

pub fn hash(data_dir: &Path) -> Result<()> {
    let state = open_active(data_dir)?;
    println!("{}", state.state_hash()?);
    Ok(())
}
