use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TokenStore;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// On-disk key-value layout. `token` is the only key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Token slot persisted as JSON in the cache directory.
///
/// Reads are served from memory; every write goes to disk before the
/// in-memory copy is swapped.
pub struct FileTokenStore {
    path: PathBuf,
    token: RwLock<Option<String>>,
}

impl FileTokenStore {
    /// Open (or lazily create) the session file under `cache_dir`.
    pub fn open(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let path = cache_dir.as_ref().join(SESSION_FILE);
        let token = Self::load(&path)?;
        debug!(path = %path.display(), has_token = token.is_some(), "Session file loaded");
        Ok(Self {
            path,
            token: RwLock::new(token),
        })
    }

    fn load(path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).context("Failed to read session file")?;
        let data: SessionFile =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(data.token.filter(|t| !t.is_empty()))
    }

    /// Write to a sibling temp file, then rename over the session file so a
    /// crash never leaves a half-written token behind.
    fn write(&self, data: &SessionFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = owner_only(&tmp).context("Failed to create session file")?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .context("Failed to write session file")?;
        drop(file);

        std::fs::rename(&tmp, &self.path).context("Failed to replace session file")?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Open `path` for writing, readable by the owner only on unix.
fn owner_only(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, token: &str) -> Result<()> {
        let mut slot = self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.write(&SessionFile {
            token: Some(token.to_string()),
        })?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileTokenStore::open(dir.path()).unwrap();
        assert_eq!(store.get(), None);
        store.set("abc").unwrap();

        let reopened = FileTokenStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get().as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_holds_single_token_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        store.set("xyz").unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({ "token": "xyz" }));
    }

    #[test]
    fn test_rewrite_replaces_token_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        store.set("abc").unwrap();
        store.set("xyz").unwrap();

        let reopened = FileTokenStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get().as_deref(), Some("xyz"));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(SESSION_FILE)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        store.set("abc").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        store.set("abc").unwrap();
        store.clear().unwrap();

        assert_eq!(store.get(), None);
        assert!(!store.path().exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_empty_token_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), r#"{"token": ""}"#).unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "not json").unwrap();
        assert!(FileTokenStore::open(dir.path()).is_err());
    }
}
