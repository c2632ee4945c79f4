use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::{Result, StoreError};
use crate::store::Store;

pub const DATA_DIR_ENV: &str = "ROLL_DATA_DIR";
pub const DATABASE_FILE: &str = "roll.db";

/// Default base directory for all roll storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".roll")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Priority: explicit override > `ROLL_DATA_DIR` > `~/.roll`.
pub fn resolve_base_dir(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    env::var(DATA_DIR_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_base_dir)
}

pub fn database_path(base: &Path) -> PathBuf {
    base.join(DATABASE_FILE)
}

impl Store {
    /// Open (creating if needed) the database under `base`.
    pub fn open_in_dir(base: &Path) -> Result<Self> {
        fs::create_dir_all(base).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", base.display()))
        })?;
        Store::open(&database_path(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_base_dir_override() {
        let dir = resolve_base_dir(Some(Path::new("/custom/dir")));
        assert_eq!(dir, PathBuf::from("/custom/dir"));
    }

    #[test]
    fn test_default_base_dir_name() {
        assert!(default_base_dir().ends_with(".roll"));
    }

    #[test]
    fn test_open_in_dir_creates_database() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("nested").join("data");
        let store = Store::open_in_dir(&base).unwrap();
        store.upsert_class("c", "C").unwrap();
        drop(store);
        assert!(database_path(&base).exists());
    }
}
