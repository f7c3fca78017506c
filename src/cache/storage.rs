//! Cache storage backends.

use color_eyre::{eyre::eyre, Result};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::traits::{CacheSnapshot, CacheStorage};

/// Name of the cache file inside the application directory.
pub const CACHE_FILE: &str = "activities.json";

/// JSON file storage.
///
/// The whole snapshot lives in one file. Writes go to a temporary file in the
/// same directory which is then renamed over the destination, so the file is
/// never seen empty or half written.
pub struct JsonFileStorage {
  path: PathBuf,
}

impl JsonFileStorage {
  /// Storage for `activities.json` inside `dir`.
  pub fn new(dir: impl AsRef<Path>) -> Self {
    Self::at(dir.as_ref().join(CACHE_FILE))
  }

  /// Storage at an explicit file path.
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Fill a temporary file next to the destination with `write`, flush it,
  /// then rename it over the destination. On any failure the temporary file
  /// is removed and the destination is left as it was.
  fn replace_with<F>(&self, write: F) -> Result<()>
  where
    F: FnOnce(&mut NamedTempFile) -> io::Result<()>,
  {
    let dir = self
      .path
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(dir)
      .map_err(|e| eyre!("Failed to create cache directory {}: {}", dir.display(), e))?;

    // Same directory as the destination so the rename never crosses filesystems
    let mut tmp = NamedTempFile::new_in(dir)
      .map_err(|e| eyre!("Failed to create temporary cache file: {}", e))?;
    write(&mut tmp).map_err(|e| eyre!("Failed to write temporary cache file: {}", e))?;
    tmp
      .as_file()
      .sync_all()
      .map_err(|e| eyre!("Failed to flush temporary cache file: {}", e))?;

    tmp.persist(&self.path).map_err(|e| {
      eyre!(
        "Failed to replace cache file {}: {}",
        self.path.display(),
        e.error
      )
    })?;

    Ok(())
  }
}

impl CacheStorage for JsonFileStorage {
  fn exists(&self) -> bool {
    self.path.is_file()
  }

  fn load(&self) -> Result<CacheSnapshot> {
    let data = fs::read(&self.path)
      .map_err(|e| eyre!("Failed to read cache file {}: {}", self.path.display(), e))?;

    serde_json::from_slice(&data)
      .map_err(|e| eyre!("Failed to parse cache file {}: {}", self.path.display(), e))
  }

  fn store(&self, snapshot: &CacheSnapshot) -> Result<()> {
    let data =
      serde_json::to_vec(snapshot).map_err(|e| eyre!("Failed to serialize cache: {}", e))?;
    self.replace_with(|file| file.write_all(&data))
  }

  fn remove(&self) -> Result<()> {
    match fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!(
        "Failed to remove cache file {}: {}",
        self.path.display(),
        e
      )),
    }
  }
}

/// In-memory storage that keeps the serialized bytes, for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
  data: std::cell::RefCell<Option<Vec<u8>>>,
  writes: std::cell::Cell<usize>,
}

#[cfg(test)]
impl MemoryStorage {
  pub fn with_bytes(data: &[u8]) -> Self {
    let storage = Self::default();
    storage.data.replace(Some(data.to_vec()));
    storage
  }

  pub fn bytes(&self) -> Option<Vec<u8>> {
    self.data.borrow().clone()
  }

  /// Number of successful `store` calls.
  pub fn writes(&self) -> usize {
    self.writes.get()
  }
}

#[cfg(test)]
impl CacheStorage for MemoryStorage {
  fn exists(&self) -> bool {
    self.data.borrow().is_some()
  }

  fn load(&self) -> Result<CacheSnapshot> {
    let data = self.data.borrow();
    let data = data.as_deref().ok_or_else(|| eyre!("No stored snapshot"))?;
    serde_json::from_slice(data).map_err(|e| eyre!("Failed to parse snapshot: {}", e))
  }

  fn store(&self, snapshot: &CacheSnapshot) -> Result<()> {
    let data = serde_json::to_vec(snapshot)?;
    self.data.replace(Some(data));
    self.writes.set(self.writes.get() + 1);
    Ok(())
  }

  fn remove(&self) -> Result<()> {
    self.data.replace(None);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::activity;
  use tempfile::TempDir;

  fn snapshot_with(ids: &[i64]) -> CacheSnapshot {
    CacheSnapshot {
      activities: ids.iter().map(|&id| activity(id)).collect(),
      ..Default::default()
    }
  }

  #[test]
  fn test_store_then_load() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path().join("nested"));
    assert!(!storage.exists());

    storage.store(&snapshot_with(&[3, 2, 1])).unwrap();
    assert!(storage.exists());

    let loaded = storage.load().unwrap();
    let ids: Vec<i64> = loaded.activities.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
  }

  #[test]
  fn test_store_leaves_no_temporary_files() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path());
    storage.store(&snapshot_with(&[1])).unwrap();
    storage.store(&snapshot_with(&[2, 1])).unwrap();

    let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
  }

  fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
      .unwrap()
      .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    names.sort();
    names
  }

  #[test]
  fn test_interrupted_write_keeps_previous_file() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path());
    storage.store(&snapshot_with(&[2, 1])).unwrap();
    let before = fs::read(storage.path()).unwrap();

    // Half of the next snapshot reaches disk, then the write fails
    let data = serde_json::to_vec(&snapshot_with(&[4, 3, 2, 1])).unwrap();
    let result = storage.replace_with(|file| {
      file.write_all(&data[..data.len() / 2])?;
      Err(io::Error::new(ErrorKind::Other, "disk full"))
    });

    assert!(result.is_err());
    assert_eq!(file_names(temp.path()), vec![CACHE_FILE.to_string()]);
    assert_eq!(fs::read(storage.path()).unwrap(), before);
    assert_eq!(storage.load().unwrap().activities.len(), 2);
  }

  #[test]
  fn test_failed_rename_leaves_no_temporary_file() {
    let temp = TempDir::new().unwrap();
    // A non-empty directory where the cache file should be cannot be replaced
    let blocked = temp.path().join(CACHE_FILE);
    fs::create_dir(&blocked).unwrap();
    fs::write(blocked.join("keep"), b"x").unwrap();

    let storage = JsonFileStorage::new(temp.path());
    assert!(storage.store(&snapshot_with(&[1])).is_err());
    assert_eq!(file_names(temp.path()), vec![CACHE_FILE.to_string()]);
    assert_eq!(fs::read(blocked.join("keep")).unwrap(), b"x");
  }

  #[test]
  fn test_missing_keys_default_to_empty() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path());
    fs::write(storage.path(), br#"{"activity_details": {}}"#).unwrap();
    assert!(storage.load().unwrap().activities.is_empty());

    fs::write(storage.path(), b"{}").unwrap();
    assert_eq!(storage.load().unwrap(), CacheSnapshot::default());
  }

  #[test]
  fn test_details_keyed_by_stringified_id() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path());
    let mut snapshot = CacheSnapshot::default();
    snapshot
      .activity_details
      .insert(42, crate::testing::detail(42));
    storage.store(&snapshot).unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&fs::read(storage.path()).unwrap()).unwrap();
    assert!(raw["activity_details"]["42"].is_object());
    assert_eq!(storage.load().unwrap(), snapshot);
  }

  #[test]
  fn test_corrupt_file_fails_to_load() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path());
    fs::write(storage.path(), b"{\"activities\": [").unwrap();
    assert!(storage.exists());
    assert!(storage.load().is_err());
  }

  #[test]
  fn test_remove_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path());
    storage.store(&snapshot_with(&[1])).unwrap();
    storage.remove().unwrap();
    assert!(!storage.exists());
    storage.remove().unwrap();
  }
}
