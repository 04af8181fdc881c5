//! Account balances kept next to the global state
//!
//! Each balance is a bincode `Coin` under `account:{name}`, so a block's
//! credits commit in the same write batch as the state they came from.

use anyhow::{anyhow, Result};
use cadence_core::{load_record, save_record, Coin, KvStore};
use cadence_global::{AccountLedger, MemoryLedger};

pub const ACCOUNT_PREFIX: &[u8] = b"account:";

pub fn account_key(account: &str) -> Vec<u8> {
    let mut key = ACCOUNT_PREFIX.to_vec();
    key.extend_from_slice(account.as_bytes());
    key
}

pub fn load_ledger<S: KvStore + ?Sized>(store: &S) -> Result<MemoryLedger> {
    let mut ledger = MemoryLedger::new();
    for (key, _) in store.scan_prefix(ACCOUNT_PREFIX)? {
        let account = std::str::from_utf8(&key[ACCOUNT_PREFIX.len()..])
            .map_err(|_| anyhow!("account key {} is not UTF-8", hex::encode(&key)))?;
        let balance: Coin = load_record(store, &key)?
            .ok_or_else(|| anyhow!("account {} vanished while loading", account))?;
        ledger.add_balance(account, balance)?;
    }
    Ok(ledger)
}

/// Write every balance in `ledger`; accounts are never removed
pub fn save_ledger<S: KvStore + ?Sized>(store: &mut S, ledger: &MemoryLedger) -> Result<()> {
    for (account, balance) in ledger.accounts() {
        save_record(store, &account_key(account), &balance)?;
    }
    Ok(())
}
