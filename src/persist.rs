//! Save storage backend: one JSON document per save name under a data
//! directory, plus a sentinel file holding the last-used save name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

const SAVE_EXT: &str = ".json";
const LAST_SAVE_FILE: &str = ".last_save";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("save name must be non-empty and free of path separators")]
    InvalidName,
    #[error("no save named {0:?}")]
    Missing(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Capability interface the engine runtime consumes. Failures surface as
/// errors here; callers log them and leave in-memory state untouched.
pub trait SaveStore: Send + Sync {
    fn save(&self, name: &str, document: &str) -> Result<(), StoreError>;
    fn load(&self, name: &str) -> Result<String, StoreError>;
    /// Best-effort listing; an unreadable directory reads as "no saves".
    fn list(&self) -> Vec<String>;
    fn delete(&self, name: &str) -> Result<(), StoreError>;
    fn set_last(&self, name: &str) -> Result<(), StoreError>;
    /// The last-used save name, if the sentinel exists and is non-empty.
    fn last(&self) -> Option<String>;
}

pub struct FileSaveStore {
    data_dir: PathBuf,
}

impl FileSaveStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> io::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// `$HOME/.valley-legend/data`, the directory the desktop shell uses.
    pub fn default_dir() -> PathBuf {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
        home.join(".valley-legend").join("data")
    }

    fn save_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(StoreError::InvalidName);
        }
        Ok(self.data_dir.join(format!("{name}{SAVE_EXT}")))
    }
}

impl SaveStore for FileSaveStore {
    fn save(&self, name: &str, document: &str) -> Result<(), StoreError> {
        let path = self.save_path(name)?;
        fs::write(path, document)?;
        Ok(())
    }

    fn load(&self, name: &str) -> Result<String, StoreError> {
        let path = self.save_path(name)?;
        match fs::read_to_string(path) {
            Ok(document) => Ok(document),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::Missing(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.data_dir) else {
            return Vec::new();
        };
        let mut saves: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                name.strip_suffix(SAVE_EXT).map(str::to_string)
            })
            .collect();
        saves.sort();
        saves
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.save_path(name)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::Missing(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn set_last(&self, name: &str) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        fs::write(self.data_dir.join(LAST_SAVE_FILE), name)?;
        Ok(())
    }

    fn last(&self) -> Option<String> {
        let name = fs::read_to_string(self.data_dir.join(LAST_SAVE_FILE)).ok()?;
        let name = name.trim().to_string();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}
