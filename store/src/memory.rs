//! In-memory ledger store for tests.

use crate::error::StoreError;
use crate::LedgerStore;
use meridian_types::{Hash256, LedgerSeq};
use std::collections::HashMap;
use std::sync::Mutex;

/// A `HashMap`-backed [`LedgerStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    by_seq: HashMap<LedgerSeq, Vec<u8>>,
    by_hash: HashMap<Hash256, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerStore for MemoryStore {
    fn save_accepted(&self, seq: LedgerSeq, hash: Hash256, raw: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.by_seq.insert(seq, raw.to_vec());
        inner.by_hash.insert(hash, raw.to_vec());
        Ok(())
    }

    fn load_by_index(&self, seq: LedgerSeq) -> Result<Vec<u8>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .by_seq
            .get(&seq)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("sequence {seq}")))
    }

    fn load_by_hash(&self, hash: &Hash256) -> Result<Vec<u8>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .by_hash
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("hash {hash}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_both_ways() {
        let store = MemoryStore::new();
        let hash = Hash256::new([0xAB; 32]);
        store.save_accepted(7, hash, &[1, 2, 3]).unwrap();

        assert_eq!(store.load_by_index(7).unwrap(), vec![1, 2, 3]);
        assert_eq!(store.load_by_hash(&hash).unwrap(), vec![1, 2, 3]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_entries_report_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load_by_index(1),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.load_by_hash(&Hash256::ZERO),
            Err(StoreError::NotFound(_))
        ));
    }
}
