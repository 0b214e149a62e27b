/// File-backed column store.
///
/// Keeps one JSON document per identity under the data directory with:
/// - SHA-256 file names (first 16 hex chars of the subject id)
/// - Atomic writes (write to .tmp, fsync, rename, fsync dir)
/// - Per-identity write mutex so migrate's check-then-write is atomic
/// - An in-memory cache of documents already read

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use reelboard_core::identity::Principal;
use reelboard_core::types::Board;
use sha2::{Digest, Sha256};

use super::{ColumnStore, StoreError, UserDocument};

pub struct FileColumnStore {
    dir: PathBuf,
    /// subject_id -> document
    docs: RwLock<HashMap<String, UserDocument>>,
    /// Per-identity write mutex
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileColumnStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        log::info!("[reelboard.store] Using document directory {}", dir.display());
        Ok(Self {
            dir,
            docs: RwLock::new(HashMap::new()),
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Deterministic file name from the subject id.
    pub fn file_name_for(subject_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(subject_id.as_bytes());
        let result = hasher.finalize();
        format!("{}.json", hex::encode(&result[..8]))
    }

    fn path_for(&self, subject_id: &str) -> PathBuf {
        self.dir.join(Self::file_name_for(subject_id))
    }

    fn get_write_lock(&self, subject_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(subject_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Cached document, else the one on disk, else None.
    fn load(&self, subject_id: &str) -> Result<Option<UserDocument>, StoreError> {
        if let Some(doc) = self
            .docs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(subject_id)
        {
            return Ok(Some(doc.clone()));
        }

        let path = self.path_for(subject_id);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let doc: UserDocument =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                subject_id: subject_id.to_string(),
                reason: e.to_string(),
            })?;

        self.docs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(subject_id.to_string(), doc.clone());
        Ok(Some(doc))
    }

    fn save(&self, doc: &UserDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(doc)?;
        Self::atomic_write(&self.path_for(&doc.subject_id), &json)?;
        self.docs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(doc.subject_id.clone(), doc.clone());
        Ok(())
    }

    /// Replace columns on the existing document or create one, refreshing
    /// the profile fields from the caller's identity.
    fn upsert(
        &self,
        principal: &Principal,
        existing: Option<UserDocument>,
        columns: Board,
    ) -> Result<UserDocument, StoreError> {
        let now = Utc::now();
        let doc = match existing {
            Some(mut doc) => {
                doc.email = principal.email.clone();
                doc.name = principal.display_name.clone();
                doc.columns = columns;
                doc.last_updated = now;
                doc.updated_at = now;
                doc
            }
            None => UserDocument::new(principal, columns),
        };
        self.save(&doc)?;
        Ok(doc)
    }

    /// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
    fn atomic_write(path: &Path, content: &str) -> Result<(), io::Error> {
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        if let Some(dir) = path.parent() {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    }
}

impl ColumnStore for FileColumnStore {
    fn get_or_create(&self, principal: &Principal) -> Result<UserDocument, StoreError> {
        if let Some(doc) = self.load(&principal.subject_id)? {
            return Ok(doc);
        }

        let lock = self.get_write_lock(&principal.subject_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        // Another request may have created it while we waited.
        if let Some(doc) = self.load(&principal.subject_id)? {
            return Ok(doc);
        }
        let doc = UserDocument::new(principal, Board::default_columns());
        self.save(&doc)?;
        log::info!(
            "[reelboard.store] Created document for {} ({})",
            principal.subject_id,
            principal.email
        );
        Ok(doc)
    }

    fn replace_columns(
        &self,
        principal: &Principal,
        columns: Board,
    ) -> Result<UserDocument, StoreError> {
        let lock = self.get_write_lock(&principal.subject_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        let existing = self.load(&principal.subject_id)?;
        self.upsert(principal, existing, columns)
    }

    fn migrate_columns(
        &self,
        principal: &Principal,
        columns: Board,
    ) -> Result<UserDocument, StoreError> {
        let lock = self.get_write_lock(&principal.subject_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        let existing = self.load(&principal.subject_id)?;
        if existing.as_ref().is_some_and(|doc| doc.columns.has_items()) {
            log::warn!(
                "[reelboard.store] Migration refused for {}: remote board already has items",
                principal.subject_id
            );
            return Err(StoreError::Conflict);
        }
        let doc = self.upsert(principal, existing, columns)?;
        log::info!(
            "[reelboard.store] Migrated {} items for {}",
            doc.columns.item_count(),
            principal.subject_id
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelboard_core::types::{Column, Item};
    use tempfile::TempDir;

    fn principal(id: &str) -> Principal {
        Principal {
            subject_id: id.to_string(),
            email: format!("{}@example.com", id),
            display_name: id.to_string(),
        }
    }

    fn board_with_item(item_id: &str) -> Board {
        let mut col = Column::new("c1", "Ideas", "yellow");
        col.items.push(Item {
            id: item_id.to_string(),
            title: "X".to_string(),
            description: String::new(),
        });
        Board::new(vec![col])
    }

    #[test]
    fn test_file_name_deterministic() {
        let a = FileColumnStore::file_name_for("user-1");
        assert_eq!(a, FileColumnStore::file_name_for("user-1"));
        assert_ne!(a, FileColumnStore::file_name_for("user-2"));
        assert_eq!(a.len(), 16 + ".json".len());
    }

    #[test]
    fn test_get_or_create_seeds_defaults() {
        let dir = TempDir::new().unwrap();
        let store = FileColumnStore::open(dir.path()).unwrap();
        let doc = store.get_or_create(&principal("u1")).unwrap();
        assert_eq!(doc.columns, Board::default_columns());
        assert_eq!(doc.email, "u1@example.com");
        assert!(dir.path().join(FileColumnStore::file_name_for("u1")).exists());
    }

    #[test]
    fn test_replace_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let store = FileColumnStore::open(dir.path()).unwrap();
        store
            .replace_columns(&principal("u1"), board_with_item("i1"))
            .unwrap();

        let reopened = FileColumnStore::open(dir.path()).unwrap();
        let doc = reopened.get_or_create(&principal("u1")).unwrap();
        assert_eq!(doc.columns, board_with_item("i1"));
    }

    #[test]
    fn test_replace_keeps_created_at() {
        let dir = TempDir::new().unwrap();
        let store = FileColumnStore::open(dir.path()).unwrap();
        let created = store.get_or_create(&principal("u1")).unwrap();
        let updated = store
            .replace_columns(&principal("u1"), Board::default())
            .unwrap();
        assert_eq!(created.created_at, updated.created_at);
        assert!(updated.last_updated >= created.last_updated);
        assert!(updated.columns.is_empty());
    }

    #[test]
    fn test_migrate_into_empty_board() {
        let dir = TempDir::new().unwrap();
        let store = FileColumnStore::open(dir.path()).unwrap();
        store.get_or_create(&principal("u1")).unwrap();
        let doc = store
            .migrate_columns(&principal("u1"), board_with_item("i1"))
            .unwrap();
        assert_eq!(doc.columns, board_with_item("i1"));
    }

    #[test]
    fn test_migrate_conflict_leaves_document_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = FileColumnStore::open(dir.path()).unwrap();
        store
            .replace_columns(&principal("u1"), board_with_item("i2"))
            .unwrap();
        let path = dir.path().join(FileColumnStore::file_name_for("u1"));
        let before = fs::read(&path).unwrap();

        let result = store.migrate_columns(&principal("u1"), board_with_item("i1"));
        assert!(matches!(result, Err(StoreError::Conflict)));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_identities_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = FileColumnStore::open(dir.path()).unwrap();
        store
            .replace_columns(&principal("u1"), board_with_item("i1"))
            .unwrap();
        let other = store.get_or_create(&principal("u2")).unwrap();
        assert_eq!(other.columns, Board::default_columns());
    }

    #[test]
    fn test_corrupt_document_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(FileColumnStore::file_name_for("u1")), "{oops").unwrap();
        let store = FileColumnStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.get_or_create(&principal("u1")),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
