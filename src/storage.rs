use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::error::DexError;

/// Durable blob persistence for the collection. One blob per installation;
/// `load` returns `None` when nothing has been saved yet.
pub trait Storage: Send {
    fn load(&self) -> Result<Option<Vec<u8>>, DexError>;
    fn save(&self, bytes: &[u8]) -> Result<(), DexError>;
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    path: Utf8PathBuf,
}

impl FileStorage {
    pub fn new() -> Result<Self, DexError> {
        let path = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(
                    dirs.data_dir().join("pokedex").join("pokedex.json"),
                )
                .ok()
            })
            .ok_or_else(|| DexError::Storage("unable to resolve data directory".to_string()))?;
        Ok(Self { path })
    }

    pub fn new_with_path(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), DexError> {
        let parent = path
            .parent()
            .ok_or_else(|| DexError::Storage("invalid storage path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DexError::Storage(err.to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix("pokedex")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DexError::Storage(err.to_string()))?;
        fs::write(temp.path(), content).map_err(|err| DexError::Storage(err.to_string()))?;
        // persist renames over an existing destination, so the previous
        // blob stays in place until the new one is complete.
        temp.persist(path.as_std_path())
            .map_err(|err| DexError::Storage(err.to_string()))?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<Vec<u8>>, DexError> {
        if !self.path.as_std_path().exists() {
            return Ok(None);
        }
        let bytes =
            fs::read(self.path.as_std_path()).map_err(|err| DexError::Storage(err.to_string()))?;
        Ok(Some(bytes))
    }

    fn save(&self, bytes: &[u8]) -> Result<(), DexError> {
        Self::write_bytes_atomic(&self.path, bytes)
    }
}
