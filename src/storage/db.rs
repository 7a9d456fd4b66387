//! RocksDB-backed embedding store.

use crate::storage::EmbeddingStore;
use crate::types::Result;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use std::path::Path;
use std::sync::Arc;

/// Column family holding cached embedding vectors.
pub const CF_EMBEDDINGS: &str = "embeddings";

/// Durable key/value store over RocksDB.
///
/// The embedding cache only needs point lookups and writes; RocksDB gives us
/// durability across restarts and safe concurrent access from multiple
/// callers without external locking.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Open (or create) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        // Read-heavy workload once the catalog vocabulary is warm
        opts.set_level_compaction_dynamic_level_bytes(true);
        opts.set_bytes_per_sync(1048576);

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(
            CF_EMBEDDINGS,
            Options::default(),
        )];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf_handle(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_EMBEDDINGS).ok_or_else(|| {
            crate::types::EngineError::Storage(format!("CF not found: {}", CF_EMBEDDINGS))
        })
    }
}

impl EmbeddingStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle()?;
        Ok(self.db.get_cf(cf, key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf_handle()?;
        Ok(self.db.put_cf(cf, key, value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_get_roundtrip() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        assert!(store.get(b"missing").unwrap().is_none());

        store.put(b"key", b"value").unwrap();
        assert_eq!(store.get(b"key").unwrap().unwrap(), b"value");
    }

    #[test]
    fn test_durable_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            store.put(b"key", b"value").unwrap();
        }
        let store = RocksDbStore::open(dir.path()).unwrap();
        assert_eq!(store.get(b"key").unwrap().unwrap(), b"value");
    }
}
