use super::{MemoryStorage, Storage};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared handle to the one key-value table of a server.
///
/// Every method runs as a single critical section, so no caller can observe
/// the table half way through another command.
#[derive(Debug, Clone, Default)]
pub struct Keyspace {
    inner: Arc<Mutex<MemoryStorage>>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.inner.lock().get(key)
    }

    pub fn set(&self, key: Bytes, value: Bytes) {
        self.inner.lock().set(key, value);
    }

    pub fn delete(&self, keys: &[Bytes]) -> usize {
        self.inner.lock().delete_multiple(keys)
    }

    pub fn exists(&self, keys: &[Bytes]) -> usize {
        self.inner.lock().exists_multiple(keys)
    }

    pub fn strlen(&self, key: &[u8]) -> usize {
        self.inner.lock().strlen(key)
    }

    /// Keys at positions `offset..offset + limit`, together with the table
    /// size observed in the same critical section.
    pub fn scan_window(&self, offset: usize, limit: usize) -> (Vec<Bytes>, usize) {
        let storage = self.inner.lock();
        (storage.keys_from(offset, limit), storage.len())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
