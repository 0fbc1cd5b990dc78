pub mod keyspace;
pub mod memory;

use bytes::Bytes;

pub use keyspace::Keyspace;
pub use memory::MemoryStorage;

/// Binary-safe string table. Absent keys are ordinary results, never errors.
pub trait Storage {
    fn get(&self, key: &[u8]) -> Option<Bytes>;
    fn set(&mut self, key: Bytes, value: Bytes);
    fn delete_multiple(&mut self, keys: &[Bytes]) -> usize;
    fn exists_multiple(&self, keys: &[Bytes]) -> usize;
    fn strlen(&self, key: &[u8]) -> usize;

    /// Up to `limit` keys starting at position `offset` of the enumeration order.
    fn keys_from(&self, offset: usize, limit: usize) -> Vec<Bytes>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
