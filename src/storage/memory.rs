use super::Storage;
use bytes::Bytes;
use std::collections::HashMap;

/// In-memory table that enumerates keys in insertion order.
///
/// Entries live in a dense vector so SCAN can slice by position. Deleting a
/// key moves the last entry into the freed slot, which keeps every operation
/// O(1) at the cost of perturbing the order of that one entry.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Vec<(Bytes, Bytes)>,
    index: HashMap<Bytes, usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn delete(&mut self, key: &[u8]) -> bool {
        log::trace!("Deleting key '{}'", key.escape_ascii());
        let Some(pos) = self.index.remove(key) else {
            return false;
        };

        self.entries.swap_remove(pos);
        if let Some((moved, _)) = self.entries.get(pos) {
            if let Some(slot) = self.index.get_mut(moved) {
                *slot = pos;
            }
        }
        true
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &[u8]) -> Option<Bytes> {
        log::trace!("Getting value for key '{}'", key.escape_ascii());
        self.index.get(key).map(|&pos| self.entries[pos].1.clone())
    }

    fn set(&mut self, key: Bytes, value: Bytes) {
        log::trace!("Setting key '{}' ({} bytes)", key.escape_ascii(), value.len());
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    fn delete_multiple(&mut self, keys: &[Bytes]) -> usize {
        keys.iter().filter(|key| self.delete(key)).count()
    }

    fn exists_multiple(&self, keys: &[Bytes]) -> usize {
        keys.iter()
            .filter(|key| self.index.contains_key(&key[..]))
            .count()
    }

    fn strlen(&self, key: &[u8]) -> usize {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].1.len())
            .unwrap_or(0)
    }

    fn keys_from(&self, offset: usize, limit: usize) -> Vec<Bytes> {
        self.entries
            .get(offset..)
            .unwrap_or_default()
            .iter()
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
