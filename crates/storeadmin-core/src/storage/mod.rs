//! Key/value storage backends.
//!
//! `KeyValueStore` mirrors the browser Storage interface that the cache and
//! the auth guard were written against:
//! - `MemoryStore`: in-process map, used for session-scoped storage and tests
//! - `FileStore`: JSON file on disk, used for durable storage
//!
//! Stores take `&self` everywhere and lock internally, so a single handle
//! (usually an `Arc`) can be shared by every consumer.

pub mod error;
pub mod file;
pub mod memory;

use std::sync::Arc;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;

pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Key at `index` in storage order. Indices shift after a removal.
    fn key(&self, index: usize) -> Option<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all keys in storage order.
    fn keys(&self) -> Vec<String> {
        (0..self.len()).filter_map(|i| self.key(i)).collect()
    }

    fn clear(&self) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn key(&self, index: usize) -> Option<String> {
        (**self).key(index)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }
}
