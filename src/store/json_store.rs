use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::store::{KeyValueStorage, StoreError};

/// One pretty JSON file per key under the app's data directory.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_dir).map_err(|source| StoreError::Write {
            key: base_dir.display().to_string(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", Self::sanitize_key(key)))
    }

    fn sanitize_key(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl KeyValueStorage for JsonStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.file_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path).map(Some).map_err(|source| StoreError::Read {
            key: key.to_string(),
            source,
        })
    }

    /// Write-then-rename so a crash never leaves a truncated file.
    fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.file_path(key);
        let tmp_path = path.with_extension("json.tmp");

        (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(value)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &path)
        })()
        .map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Write {
                key: key.to_string(),
                source,
            }
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.file_path(key);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path).map_err(|source| StoreError::Write {
            key: key.to_string(),
            source,
        })
    }
}
