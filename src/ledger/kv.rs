//! The persistence seam: an opaque key-value store.
//!
//! The deployed system keeps its world state in a ledger; the core only
//! ever needs `put`/`get` over opaque bytes, so that is the whole trait.
//! The in-memory implementation backs tests and the standalone server.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::Result;

/// Opaque byte store keyed by strings.
pub trait KvStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Fetch the value under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a batch of entries as one logical commit. The default applies
    /// them one by one; implementations with a native transaction should
    /// override it.
    fn put_many(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }
}

impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put_many(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        (**self).put_many(entries)
    }
}

/// In-memory world state.
#[derive(Default)]
pub struct MemoryStore {
    cells: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
        cells.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        Ok(cells.get(key).cloned())
    }

    fn put_many(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            cells.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_roundtrip() {
        let store = MemoryStore::new();
        store.put("record000", b"hello").unwrap();
        assert_eq!(store.get("record000").unwrap().unwrap(), b"hello");
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let store = MemoryStore::new();
        store.put("k", b"old").unwrap();
        store.put("k", b"new").unwrap();
        assert_eq!(store.get("k").unwrap().unwrap(), b"new");
    }

    #[test]
    fn test_put_many_applies_all() {
        let store = MemoryStore::new();
        let entries = vec![
            ("a".to_string(), vec![1u8]),
            ("b".to_string(), vec![2u8]),
        ];
        store.put_many(&entries).unwrap();
        assert_eq!(store.get("a").unwrap().unwrap(), vec![1]);
        assert_eq!(store.get("b").unwrap().unwrap(), vec![2]);
    }
}
