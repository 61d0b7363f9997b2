//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbError, LmdbMetaStore};

/// Default memory map size. Governance snapshots are small.
pub const DEFAULT_MAP_SIZE: usize = 64 * 1024 * 1024;

const MAX_DBS: u32 = 4;
const META_DB: &str = "meta";

/// An open LMDB environment rooted at a data directory.
///
/// LMDB allows one open environment per path in a process: drop every store
/// created from it before opening the same directory again.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at `path`, creating the directory
    /// if needed.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        let mut options = EnvOpenOptions::new();
        options.map_size(map_size).max_dbs(MAX_DBS);
        // SAFETY: the environment is opened once per path and the data file
        // is only modified through this process's heed handles.
        let env = unsafe { options.open(path)? };
        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The metadata store, creating its database on first use.
    pub fn meta_store(&self) -> Result<LmdbMetaStore, LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        let meta_db: Database<Bytes, Bytes> = self.env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;
        Ok(LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db,
        })
    }
}
