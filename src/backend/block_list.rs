use super::error::{Error, Result};
use super::types::BlockedEntry;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLock;

/// Local store of ids the user chose to hide, kept in insertion order.
pub trait BlockList {
    /// Inserting an id that is already present is a no-op.
    fn insert(&self, entry: BlockedEntry) -> Result<()>;
    fn remove(&self, id: &str) -> Result<bool>;
    fn list_all(&self) -> Result<Vec<BlockedEntry>>;
    fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.list_all()?.iter().any(|entry| entry.id == id))
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::LocalStore(String::from("lock poisoned"))
}

fn insert_entry(entries: &mut Vec<BlockedEntry>, entry: BlockedEntry) -> bool {
    if entries.iter().any(|e| e.id == entry.id) {
        return false;
    }
    entries.push(entry);
    true
}

fn remove_entry(entries: &mut Vec<BlockedEntry>, id: &str) -> bool {
    let len = entries.len();
    entries.retain(|e| e.id != id);
    entries.len() != len
}

#[derive(Debug, Default)]
pub struct MemoryBlockList {
    entries: RwLock<Vec<BlockedEntry>>,
}

impl MemoryBlockList {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = Vec::new();
        for id in ids {
            insert_entry(&mut entries, BlockedEntry::new(id));
        }
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl BlockList for MemoryBlockList {
    fn insert(&self, entry: BlockedEntry) -> Result<()> {
        insert_entry(&mut *self.entries.write().map_err(poisoned)?, entry);
        Ok(())
    }
    fn remove(&self, id: &str) -> Result<bool> {
        Ok(remove_entry(&mut *self.entries.write().map_err(poisoned)?, id))
    }
    fn list_all(&self) -> Result<Vec<BlockedEntry>> {
        Ok(self.entries.read().map_err(poisoned)?.clone())
    }
}

/// Block list persisted as a JSON array. The whole file is rewritten on change.
#[derive(Debug)]
pub struct JsonBlockList {
    path: PathBuf,
    entries: RwLock<Vec<BlockedEntry>>,
}

impl JsonBlockList {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).map_err(|e| {
                Error::LocalStore(format!("failed to parse {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(Error::LocalStore(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        log::debug!("loaded {} blocked entries from {}", entries.len(), path.display());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }
    fn save(&self, entries: &[BlockedEntry]) -> Result<()> {
        let store_error = |e: std::io::Error| {
            Error::LocalStore(format!("failed to write {}: {e}", self.path.display()))
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(store_error)?;
        }
        let s = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::LocalStore(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, s).map_err(store_error)?;
        fs::rename(&tmp, &self.path).map_err(store_error)
    }
}

// Changes are applied to a copy and kept only once the file is written.
impl BlockList for JsonBlockList {
    fn insert(&self, entry: BlockedEntry) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let mut updated = entries.clone();
        if insert_entry(&mut updated, entry) {
            self.save(&updated)?;
            *entries = updated;
        }
        Ok(())
    }
    fn remove(&self, id: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let mut updated = entries.clone();
        let removed = remove_entry(&mut updated, id);
        if removed {
            self.save(&updated)?;
            *entries = updated;
        }
        Ok(removed)
    }
    fn list_all(&self) -> Result<Vec<BlockedEntry>> {
        Ok(self.entries.read().map_err(poisoned)?.clone())
    }
}
