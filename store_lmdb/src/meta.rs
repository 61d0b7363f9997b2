//! LMDB implementation of MetaStore.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use agora_store::{MetaStore, StoreError};

use crate::environment::DEFAULT_MAP_SIZE;
use crate::{LmdbEnvironment, LmdbError};

/// Metadata kept in a single LMDB database. Every write is its own
/// committed transaction.
pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbMetaStore {
    /// Open the metadata store of the environment at `path` with the
    /// default map size.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LmdbError> {
        LmdbEnvironment::open(path.as_ref(), DEFAULT_MAP_SIZE)?.meta_store()
    }
}

impl MetaStore for LmdbMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("meta key '{key}'")))?;
        Ok(val.to_vec())
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbMetaStore::open(dir.path()).unwrap();
        store.put_meta("governance_state", b"snapshot").unwrap();
        assert_eq!(store.get_meta("governance_state").unwrap(), b"snapshot");

        store.delete_meta("governance_state").unwrap();
        assert!(matches!(
            store.get_meta("governance_state"),
            Err(StoreError::NotFound(_))
        ));
        // Deleting twice is fine.
        store.delete_meta("governance_state").unwrap();
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbMetaStore::open(dir.path()).unwrap();
        store.put_meta("k", b"one").unwrap();
        store.put_meta("k", b"two").unwrap();
        assert_eq!(store.get_meta("k").unwrap(), b"two");
    }

    #[test]
    fn test_schema_version_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbMetaStore::open(dir.path()).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 0);
        store.set_schema_version(3).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 3);
    }

    #[test]
    fn test_reopen_sees_previous_writes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LmdbMetaStore::open(dir.path()).unwrap();
            store.put_meta("persisted", b"yes").unwrap();
        }
        let store = LmdbMetaStore::open(dir.path()).unwrap();
        assert_eq!(store.try_get_meta("persisted").unwrap(), Some(b"yes".to_vec()));
        assert_eq!(store.try_get_meta("absent").unwrap(), None);
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let env = LmdbEnvironment::open(&nested, DEFAULT_MAP_SIZE).unwrap();
        assert_eq!(env.path(), nested.as_path());
        assert!(nested.is_dir());
    }
}
