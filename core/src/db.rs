//! Sled-based persistence for engine state
use crate::error::StoreError;
use crate::store::KvStore;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    path: String,
}

impl SledStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = sled::open(&path)
            .map_err(|e| StoreError::Backend(format!("Failed to open database: {}", e)))?;

        log::debug!("Opened state database at {}", path_str);
        Ok(SledStore { db, path: path_str })
    }

    /// Throwaway database that is removed when dropped
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::Backend(format!("Failed to open temporary database: {}", e)))?;

        Ok(SledStore {
            db,
            path: String::new(),
        })
    }

    /// Get the database path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db
            .get(key)
            .map(|value| value.map(|v| v.to_vec()))
            .map_err(|e| StoreError::Backend(format!("Failed to load record: {}", e)))
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.db
            .insert(key, value)
            .map_err(|e| StoreError::Backend(format!("Failed to save record: {}", e)))?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.db
            .remove(key)
            .map_err(|e| StoreError::Backend(format!("Failed to remove record: {}", e)))?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut entries = Vec::new();

        for item in self.db.scan_prefix(prefix) {
            match item {
                Ok((key, value)) => entries.push((key.to_vec(), value.to_vec())),
                Err(e) => {
                    return Err(StoreError::Backend(format!(
                        "Failed to scan records: {}",
                        e
                    )))
                }
            }
        }

        Ok(entries)
    }

    /// Flush to disk so state survives a restart
    fn flush(&mut self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::Backend(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state");

        {
            let mut store = SledStore::open(&path).unwrap();
            store.set(b"event:0000000010", vec![1, 2, 3]).unwrap();
            store.set(b"event:0000000002", vec![4]).unwrap();
            store.flush().unwrap();
        }

        let mut store = SledStore::open(&path).unwrap();
        assert_eq!(store.path(), path.to_string_lossy());
        assert_eq!(store.get(b"event:0000000010").unwrap(), Some(vec![1, 2, 3]));

        let keys: Vec<_> = store
            .scan_prefix(b"event:")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            keys,
            vec![b"event:0000000002".to_vec(), b"event:0000000010".to_vec()]
        );

        store.delete(b"event:0000000002").unwrap();
        assert_eq!(store.get(b"event:0000000002").unwrap(), None);
    }
}
