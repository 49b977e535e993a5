//! Local list of generated documents.
//!
//! The whole list lives as one JSON array under [`HISTORY_KEY`] in a [`KeyValueStore`].
//! Every mutation reads the list, changes it and writes it back in full; concurrent
//! writers simply overwrite each other.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::records::{ContractRecord, InvoiceRecord, MetricsRecord};

/// Key under which the history list is stored.
pub const HISTORY_KEY: &str = "documentHistory";

/// Minimal string key/value persistence.
pub trait KeyValueStore {
    /// Returns the stored value, `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Replaces the stored value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores every key as `<dir>/<key>.json`.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory holding the files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&staging, value)?;
        fs::rename(&staging, &target)?;
        debug!("Wrote {}", target.display());
        Ok(())
    }
}

/// In-memory store, handy for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))?;
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Kind of generated document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Report,
    Invoice,
    Contract,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Report => "report",
            DocumentType::Invoice => "invoice",
            DocumentType::Contract => "contract",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Millisecond timestamp of generation, unique within the list.
    pub id: String,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    /// Invoice kind or report orientation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Snapshot of the record the document was generated from.
    #[serde(rename = "data")]
    pub record: Value,
    pub generated_at: DateTime<Utc>,
    pub file_name: String,
}

impl HistoryEntry {
    /// Creates an entry stamped with `generated_at`; the id is derived from it.
    pub fn new<R: Serialize>(
        document_type: DocumentType,
        subtype: Option<String>,
        record: &R,
        file_name: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: generated_at.timestamp_millis().to_string(),
            document_type,
            subtype,
            record: serde_json::to_value(record)?,
            generated_at,
            file_name: file_name.into(),
        })
    }

    /// Human readable document label.
    pub fn label(&self) -> &'static str {
        match (self.document_type, self.subtype.as_deref()) {
            (DocumentType::Invoice, Some("advance")) => "Faktura Zaliczkowa",
            (DocumentType::Invoice, Some("final")) => "Faktura Końcowa",
            (DocumentType::Invoice, Some("full")) => "Faktura Pełna",
            (DocumentType::Invoice, _) => "Faktura",
            (DocumentType::Report, _) => "Raport Facebook Ads",
            (DocumentType::Contract, _) => "Umowa Marketingowa",
        }
    }
}

/// A record restored from a history entry, ready to be rendered again.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredRecord {
    Report(MetricsRecord),
    Invoice(InvoiceRecord),
    Contract(ContractRecord),
}

/// Newest-first list of generated documents.
pub struct HistoryStore<S> {
    store: S,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns every entry, newest first.
    ///
    /// A corrupt list is reported as a storage error rather than silently dropped, so
    /// the next append cannot overwrite it.
    pub fn list(&self) -> Result<Vec<HistoryEntry>> {
        match self.store.get(HISTORY_KEY)? {
            None => Ok(Vec::new()),
            Some(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Some(contents) => serde_json::from_str(&contents)
                .map_err(|err| Error::Storage(format!("cannot parse {}: {}", HISTORY_KEY, err))),
        }
    }

    /// Prepends `entry`, bumping its id until it is unique. Returns the stored entry.
    pub fn append(&self, mut entry: HistoryEntry) -> Result<HistoryEntry> {
        let mut entries = self.list()?;
        while entries.iter().any(|existing| existing.id == entry.id) {
            entry.id = bump_id(&entry.id);
        }
        entries.insert(0, entry.clone());
        self.save(&entries)?;
        Ok(entry)
    }

    /// Removes the entry with `id`; returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut entries = self.list()?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }

    /// Looks up an entry by id.
    pub fn get(&self, id: &str) -> Result<Option<HistoryEntry>> {
        Ok(self.list()?.into_iter().find(|entry| entry.id == id))
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        self.store.set(HISTORY_KEY, &json)
    }
}

/// Restores the typed record of `entry` so the document can be rendered again.
pub fn regenerate(entry: &HistoryEntry) -> Result<StoredRecord> {
    let data = entry.record.clone();
    let restored = match entry.document_type {
        DocumentType::Report => serde_json::from_value(data).map(StoredRecord::Report),
        DocumentType::Invoice => serde_json::from_value(data).map(StoredRecord::Invoice),
        DocumentType::Contract => serde_json::from_value(data).map(StoredRecord::Contract),
    };
    restored.map_err(|err| {
        warn!("History entry {} has an unreadable record: {}", entry.id, err);
        Error::Storage(format!("entry {} cannot be restored: {}", entry.id, err))
    })
}

fn bump_id(id: &str) -> String {
    match id.parse::<u64>() {
        Ok(value) => match value.checked_add(1) {
            Some(next) => next.to_string(),
            None => format!("{}-1", id),
        },
        Err(_) => format!("{}-1", id),
    }
}
