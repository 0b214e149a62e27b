/// Local key-value persistence, the signed-out counterpart of the remote store.
///
/// Reads are permissive: a missing key or a value that fails to parse yields
/// the caller's default. Write failures are logged and swallowed so the
/// in-memory board keeps working even when the disk does not.
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::manager::{BoardBackend, BoardError};
use crate::types::{Board, LOCAL_BOARD_KEY};

/// Raw string storage addressed by key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One file per key inside a directory: `<dir>/<key>.json`.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    /// Write to a sibling tmp file, fsync, then rename over the target.
    fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        Self::atomic_write(&self.path_for(key), value)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Read and parse `key`, falling back to `default` on absence or any error.
pub fn get_item<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, default: T) -> T {
    match store.get(key) {
        Ok(Some(raw)) if !raw.is_empty() => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::error!("[reelboard.local] Error reading key \"{}\": {}", key, e);
                default
            }
        },
        Ok(_) => default,
        Err(e) => {
            log::error!("[reelboard.local] Error reading key \"{}\": {}", key, e);
            default
        }
    }
}

pub fn set_item<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(io::Error::other)
        .and_then(|json| store.set(key, &json));
    if let Err(e) = result {
        log::error!("[reelboard.local] Error setting key \"{}\": {}", key, e);
    }
}

pub fn remove_item(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        log::error!("[reelboard.local] Error removing key \"{}\": {}", key, e);
    }
}

/// Board backend for anonymous sessions, written through on every commit.
pub struct LocalBoardStore<S: KeyValueStore> {
    store: S,
    board: Mutex<Board>,
}

impl<S: KeyValueStore> LocalBoardStore<S> {
    /// Load the board under the fixed key, seeding the default columns.
    pub fn open(store: S) -> Self {
        let board = get_item(&store, LOCAL_BOARD_KEY, Board::default_columns());
        Self {
            store,
            board: Mutex::new(board),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> BoardBackend for LocalBoardStore<S> {
    fn snapshot(&self) -> Board {
        self.board.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn commit<R>(&self, f: impl FnOnce(&Board) -> (Board, R)) -> Result<R, BoardError> {
        let mut board = self.board.lock().unwrap_or_else(|e| e.into_inner());
        let (next, out) = f(&board);
        set_item(&self.store, LOCAL_BOARD_KEY, &next);
        *board = next;
        Ok(out)
    }
}
