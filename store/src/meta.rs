//! Metadata storage trait.

use crate::StoreError;

/// Key under which the schema version is stored.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// A generic key-value store for engine snapshots and internal bookkeeping.
pub trait MetaStore {
    /// Store a metadata value, replacing any previous value.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a metadata value. Missing keys yield [`StoreError::NotFound`].
    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Delete a metadata entry. Deleting a missing key is not an error.
    fn delete_meta(&self, key: &str) -> Result<(), StoreError>;

    /// Retrieve a value, mapping a missing key to `None`.
    fn try_get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.get_meta(key) {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get the stored schema version (0 when never set).
    fn get_schema_version(&self) -> Result<u32, StoreError> {
        match self.try_get_meta(SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let raw: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption(format!(
                        "schema version has {} bytes, expected 4",
                        bytes.len()
                    ))
                })?;
                Ok(u32::from_le_bytes(raw))
            }
            None => Ok(0),
        }
    }

    /// Set the schema version.
    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta(SCHEMA_VERSION_KEY, &version.to_le_bytes())
    }
}
