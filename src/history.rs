//! Search history storage
//!
//! Remembers the most recent search keywords in a JSON file, by default in
//! the platform's data directory. Every operation reads the file, applies its
//! change and writes the result back through a temporary sibling file that is
//! renamed into place, so no file handle outlives a call.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;
use ulid::{Generator, Ulid};

/// Number of keywords kept when no capacity is given
pub const DEFAULT_CAPACITY: usize = 10;

const HISTORY_FILE_NAME: &str = "search_history.json";

/// Errors that can occur while reading or writing the search history
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Failed to determine the data directory location
    #[error("Failed to determine data directory location")]
    DataDirectoryNotFound,

    /// Failed to create the directory holding the history file
    #[error("Failed to create history directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read the history file
    #[error("Failed to read history file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the history file
    #[error("Failed to write history file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The history file is not valid JSON
    #[error("Failed to deserialize history file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize the history
    #[error("Failed to serialize history: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A bounded, most-recent-first list of search keywords
///
/// Keywords are compared case-insensitively. Storing a keyword that is
/// already present replaces the old spelling and moves it to the front.
pub trait SearchHistory {
    /// Records `keyword` as the most recent search.
    fn update(&self, keyword: &str) -> Result<(), HistoryError>;

    /// Forgets `keyword`. Unknown keywords are ignored.
    fn remove(&self, keyword: &str) -> Result<(), HistoryError>;

    /// The stored keywords, most recent first.
    fn list(&self) -> Result<Vec<String>, HistoryError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryEntry {
    key: String,
    keyword: String,
    #[serde(with = "ulid_string")]
    stamp: Ulid,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    entries: Vec<HistoryEntry>,
}

/// [`SearchHistory`] persisted as a JSON file
pub struct FileSearchHistory {
    path: PathBuf,
    capacity: usize,
    /// Serializes writers and hands out monotonic stamps
    writer: Mutex<Generator>,
}

impl FileSearchHistory {
    /// Opens the history in the platform data directory with the default
    /// capacity.
    ///
    /// The file itself is created on the first write.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let history = FileSearchHistory::open_default()?;
    /// history.update("Pasila")?;
    /// ```
    pub fn open_default() -> Result<Self, HistoryError> {
        let proj_dirs = directories::ProjectDirs::from("fi", "areena", "areena_browser")
            .ok_or(HistoryError::DataDirectoryNotFound)?;

        let path = proj_dirs.data_dir().join(HISTORY_FILE_NAME);
        Ok(Self::at_path(path, DEFAULT_CAPACITY))
    }

    /// Uses the history file at `path`, keeping at most `capacity` keywords.
    pub fn at_path(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            writer: Mutex::new(Generator::new()),
        }
    }

    /// Location of the history file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HistoryFile, HistoryError> {
        if !self.path.exists() {
            return Ok(HistoryFile::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| HistoryError::ReadFailed {
            path: self.path.clone(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| HistoryError::DeserializationFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    fn store(&self, history: &HistoryFile) -> Result<(), HistoryError> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| HistoryError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(history)?;

        let temp = TempFileGuard::beside(&self.path);
        fs::write(&temp.path, content).map_err(|e| HistoryError::WriteFailed {
            path: temp.path.clone(),
            source: e,
        })?;
        fs::rename(&temp.path, &self.path).map_err(|e| HistoryError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

impl SearchHistory for FileSearchHistory {
    fn update(&self, keyword: &str) -> Result<(), HistoryError> {
        if keyword.trim().is_empty() {
            debug!("Not recording an empty search keyword");
            return Ok(());
        }

        let mut stamps = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut history = self.load()?;
        let key = history_key(keyword);

        history.entries.retain(|entry| entry.key != key);

        let mut stamp = stamps.generate().unwrap_or_else(|_| Ulid::new());
        if let Some(newest) = history.entries.iter().map(|entry| entry.stamp).max() {
            if newest >= stamp {
                stamp = newest.increment().unwrap_or(newest);
            }
        }

        history.entries.push(HistoryEntry {
            key,
            keyword: keyword.to_string(),
            stamp,
        });
        history.entries.sort_by(|a, b| b.stamp.cmp(&a.stamp));
        history.entries.truncate(self.capacity);

        debug!(keyword, path = %self.path.display(), "Recording search keyword");
        self.store(&history)
    }

    fn remove(&self, keyword: &str) -> Result<(), HistoryError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut history = self.load()?;
        let key = history_key(keyword);

        let before = history.entries.len();
        history.entries.retain(|entry| entry.key != key);
        if history.entries.len() == before {
            return Ok(());
        }

        debug!(keyword, path = %self.path.display(), "Removing search keyword");
        self.store(&history)
    }

    fn list(&self) -> Result<Vec<String>, HistoryError> {
        let mut entries = self.load()?.entries;
        entries.sort_by(|a, b| b.stamp.cmp(&a.stamp));

        Ok(entries
            .into_iter()
            .take(self.capacity)
            .map(|entry| entry.keyword)
            .collect())
    }
}

/// Case-insensitive identity of a keyword: the first 16 hex digits of the
/// BLAKE3 hash of its lowercase form.
fn history_key(keyword: &str) -> String {
    let hash = blake3::hash(keyword.to_lowercase().as_bytes());
    hash.to_hex().as_str()[..16].to_string()
}

/// Temporary file next to a target path, deleted on drop unless it has been
/// renamed away.
struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    fn beside(target: &Path) -> Self {
        let file_name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| HISTORY_FILE_NAME.to_string());

        Self {
            path: target.with_file_name(format!(".{}_{}.tmp", file_name, Ulid::new())),
        }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

mod ulid_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use ulid::Ulid;

    pub fn serialize<S: Serializer>(stamp: &Ulid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(stamp)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ulid, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ulid::from_string(&text).map_err(serde::de::Error::custom)
    }
}
