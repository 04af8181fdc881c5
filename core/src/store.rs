//! Key-value store boundary
//!
//! All engine state is (de)serialized through `KvStore`. Keys are compared
//! bytewise and `scan_prefix` must return entries in ascending key order,
//! which the event store relies on for time-ordered release.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// All entries whose key starts with `prefix`, ascending by key
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl<S: KvStore + ?Sized> KvStore for &mut S {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        (**self).scan_prefix(prefix)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        (**self).flush()
    }
}

/// Load and decode a bincode record
pub fn load_record<T, S>(store: &S, key: &[u8]) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    match store.get(key)? {
        Some(data) => {
            let record = bincode::deserialize(&data).map_err(|e| {
                StoreError::Unmarshal(format!("{}: {}", String::from_utf8_lossy(key), e))
            })?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

/// Encode and store a bincode record
pub fn save_record<T, S>(store: &mut S, key: &[u8], record: &T) -> Result<(), StoreError>
where
    T: Serialize,
    S: KvStore + ?Sized,
{
    let data = bincode::serialize(record)
        .map_err(|e| StoreError::Marshal(format!("{}: {}", String::from_utf8_lossy(key), e)))?;
    store.set(key, data)
}

/// In-memory store, used by tests and simulations
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// Write buffer over another store.
///
/// Reads see buffered writes first. Nothing reaches the inner store until
/// `commit`; dropping the overlay discards every buffered change, which gives
/// callers a per-transaction (or per-event) scope.
#[derive(Debug)]
pub struct Overlay<S> {
    inner: S,
    // `None` marks a pending delete
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<S: KvStore> Overlay<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered sets and deletes
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Apply buffered writes to the inner store in key order
    pub fn commit(mut self) -> Result<S, StoreError> {
        let writes = std::mem::take(&mut self.writes);
        for (key, value) in writes {
            match value {
                Some(value) => self.inner.set(&key, value)?,
                None => self.inner.delete(&key)?,
            }
        }
        Ok(self.inner)
    }

    /// Drop buffered writes and hand back the untouched inner store
    pub fn discard(self) -> S {
        self.inner
    }
}

impl<S: KvStore> KvStore for Overlay<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.clone()),
            None => self.inner.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.inner.scan_prefix(prefix)?.into_iter().collect();

        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}
