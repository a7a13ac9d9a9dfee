//! Durable word→image dictionary.
//!
//! One JSON record on disk maps normalized words to optional image payloads.
//! The store is opened once and handed to whoever needs it; every mutation
//! validates first and writes the whole record back, so a failed operation
//! never leaves a half-updated file.
//!
//! Record shape (also the export/import wire format):
//! `{version, lastUpdated, words: {<word>: {imageData, source, dateAdded, lastUpdated}}}`

use crate::encoding;
use crate::error::{Result, WordbeamError};
use crate::text_utils::normalize_word;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DICTIONARY_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    #[serde(rename = "imageData")]
    pub image_data: Option<String>,
    pub source: String,
    #[serde(rename = "dateAdded")]
    pub date_added: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DictionaryRecord {
    #[serde(default = "default_version")]
    version: String,
    #[serde(rename = "lastUpdated", default)]
    last_updated: String,
    words: BTreeMap<String, WordEntry>,
}

fn default_version() -> String {
    DICTIONARY_VERSION.to_string()
}

impl DictionaryRecord {
    fn empty() -> Self {
        DictionaryRecord {
            version: default_version(),
            last_updated: Utc::now().to_rfc3339(),
            words: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Imported entries overwrite same-key entries; everything else is kept.
    Merge,
    /// The whole record is replaced verbatim.
    Replace,
}

#[derive(Debug, Clone, Copy)]
pub struct DictionaryStats {
    pub word_count: usize,
    pub estimated_size_bytes: usize,
}

impl DictionaryStats {
    pub fn estimated_size_kib(&self) -> usize {
        (self.estimated_size_bytes + 512) / 1024
    }
}

pub struct DictionaryStore {
    path: PathBuf,
    record: DictionaryRecord,
}

impl DictionaryStore {
    /// Open the store at `path`, initializing an empty record when the file
    /// is absent or unreadable.
    pub fn open(path: &Path) -> Self {
        let record = match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str::<DictionaryRecord>(&data) {
                Ok(record) => {
                    debug!(path = %path.display(), words = record.words.len(), "Loaded dictionary");
                    record
                }
                Err(err) => {
                    warn!(path = %path.display(), "Dictionary file unreadable, starting empty: {err}");
                    DictionaryRecord::empty()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "No dictionary yet; starting empty");
                DictionaryRecord::empty()
            }
        };
        DictionaryStore {
            path: path.to_path_buf(),
            record,
        }
    }

    /// Stored image for a word, or `None` when absent or stored without one.
    /// Never fails; an absent dictionary reads as empty.
    pub fn get_image(&self, word: &str) -> Option<String> {
        let key = normalize_word(word);
        self.record
            .words
            .get(&key)
            .and_then(|entry| entry.image_data.clone())
    }

    /// Create or update an entry. `dateAdded` survives updates; both the
    /// entry and the dictionary get a fresh `lastUpdated`.
    pub fn save_word(&mut self, word: &str, image_data: Option<&str>) -> Result<()> {
        let key = normalize_word(word);
        if key.is_empty() {
            return Err(WordbeamError::Validation("word cannot be empty".to_string()));
        }
        if let Some(payload) = image_data {
            encoding::validate_data_uri(payload)?;
        }

        let now = Utc::now().to_rfc3339();
        let date_added = self
            .record
            .words
            .get(&key)
            .map(|entry| entry.date_added.clone())
            .unwrap_or_else(|| now.clone());
        self.record.words.insert(
            key.clone(),
            WordEntry {
                image_data: image_data.map(str::to_string),
                source: "custom".to_string(),
                date_added,
                last_updated: now.clone(),
            },
        );
        self.record.last_updated = now;
        self.persist()?;
        info!(word = %key, has_image = image_data.is_some(), "Saved dictionary word");
        Ok(())
    }

    /// Remove an entry; unknown words are an error.
    pub fn delete_word(&mut self, word: &str) -> Result<()> {
        let key = normalize_word(word);
        if self.record.words.remove(&key).is_none() {
            return Err(WordbeamError::NotFound(key));
        }
        self.record.last_updated = Utc::now().to_rfc3339();
        self.persist()?;
        info!(word = %key, "Deleted dictionary word");
        Ok(())
    }

    /// The full current mapping.
    pub fn words(&self) -> &BTreeMap<String, WordEntry> {
        &self.record.words
    }

    pub fn stats(&self) -> DictionaryStats {
        let estimated_size_bytes = serde_json::to_string(&self.record)
            .map(|serialized| serialized.len())
            .unwrap_or(0);
        DictionaryStats {
            word_count: self.record.words.len(),
            estimated_size_bytes,
        }
    }

    /// Write the record to `path` for backup or sharing. No mutation.
    pub fn export_to(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.record)?;
        fs::write(path, serialized)?;
        info!(path = %path.display(), words = self.record.words.len(), "Exported dictionary");
        Ok(())
    }

    /// Import a serialized dictionary. The payload is validated in full
    /// before anything is written, so a bad document changes nothing.
    pub fn import_str(&mut self, payload: &str, mode: ImportMode) -> Result<()> {
        let imported: DictionaryRecord = serde_json::from_str(payload)
            .map_err(|err| WordbeamError::Format(err.to_string()))?;

        match mode {
            ImportMode::Replace => {
                info!(words = imported.words.len(), "Replacing dictionary from import");
                self.record = imported;
            }
            ImportMode::Merge => {
                info!(words = imported.words.len(), "Merging imported dictionary");
                for (key, entry) in imported.words {
                    self.record.words.insert(normalize_word(&key), entry);
                }
                self.record.last_updated = Utc::now().to_rfc3339();
            }
        }
        self.persist()
    }

    /// Reset to a fresh empty record.
    pub fn clear(&mut self) -> Result<()> {
        self.record = DictionaryRecord::empty();
        self.persist()?;
        info!("Cleared dictionary");
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string(&self.record)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DictionaryStore, ImportMode};
    use crate::error::WordbeamError;
    use tempfile::TempDir;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";
    const OTHER: &str = "data:image/jpeg;base64,/9j/4AA=";

    fn store_in(dir: &TempDir) -> DictionaryStore {
        DictionaryStore::open(&dir.path().join("dictionary.json"))
    }

    #[test]
    fn lookups_normalize_case_and_whitespace() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save_word("Elephant", Some(PIXEL)).unwrap();
        assert_eq!(store.get_image("elephant").as_deref(), Some(PIXEL));
        assert_eq!(store.get_image("  ELEPHANT  ").as_deref(), Some(PIXEL));
        assert_eq!(store.get_image("elephant"), store.get_image("Elephant"));
    }

    #[test]
    fn empty_word_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let err = store.save_word("   ", None).unwrap_err();
        assert!(matches!(err, WordbeamError::Validation(_)));
        assert_eq!(store.words().len(), 0);
    }

    #[test]
    fn malformed_payload_does_not_mutate() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let err = store.save_word("cat", Some("not-a-data-uri")).unwrap_err();
        assert!(matches!(err, WordbeamError::Validation(_)));
        assert!(store.words().is_empty());
    }

    #[test]
    fn resaving_preserves_date_added() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save_word("cat", None).unwrap();
        let added = store.words().get("cat").unwrap().date_added.clone();
        store.save_word("cat", Some(PIXEL)).unwrap();
        let entry = store.words().get("cat").unwrap();
        assert_eq!(entry.date_added, added);
        assert_eq!(entry.image_data.as_deref(), Some(PIXEL));
    }

    #[test]
    fn words_without_images_read_as_none() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save_word("cloud", None).unwrap();
        assert!(store.words().contains_key("cloud"));
        assert_eq!(store.get_image("cloud"), None);
    }

    #[test]
    fn delete_of_unknown_word_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let err = store.delete_word("ghost").unwrap_err();
        assert!(matches!(err, WordbeamError::NotFound(_)));
    }

    #[test]
    fn delete_removes_the_entry() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save_word("cat", Some(PIXEL)).unwrap();
        store.delete_word("CAT").unwrap();
        assert!(store.words().is_empty());
    }

    #[test]
    fn store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dictionary.json");
        {
            let mut store = DictionaryStore::open(&path);
            store.save_word("cat", Some(PIXEL)).unwrap();
        }
        let reopened = DictionaryStore::open(&path);
        assert_eq!(reopened.get_image("cat").as_deref(), Some(PIXEL));
    }

    #[test]
    fn export_then_replace_import_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save_word("cat", Some(PIXEL)).unwrap();
        store.save_word("dog", None).unwrap();

        let export_path = dir.path().join("backup.json");
        store.export_to(&export_path).unwrap();
        let exported = std::fs::read_to_string(&export_path).unwrap();

        store.clear().unwrap();
        assert!(store.words().is_empty());

        store.import_str(&exported, ImportMode::Replace).unwrap();
        assert_eq!(store.words().len(), 2);
        assert_eq!(store.get_image("cat").as_deref(), Some(PIXEL));
        assert!(store.words().contains_key("dog"));
    }

    #[test]
    fn merge_import_overwrites_same_keys_and_keeps_the_rest() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save_word("cat", Some(OTHER)).unwrap();
        store.save_word("dog", Some(PIXEL)).unwrap();

        let incoming = format!(
            r#"{{"version":"1.0","lastUpdated":"2024-01-01T00:00:00Z","words":{{
                "cat": {{"imageData":"{PIXEL}","source":"custom",
                         "dateAdded":"2024-01-01T00:00:00Z","lastUpdated":"2024-01-01T00:00:00Z"}}
            }}}}"#
        );
        store.import_str(&incoming, ImportMode::Merge).unwrap();

        assert_eq!(store.words().len(), 2);
        assert_eq!(store.get_image("cat").as_deref(), Some(PIXEL));
        assert_eq!(store.get_image("dog").as_deref(), Some(PIXEL));
    }

    #[test]
    fn import_without_words_mapping_fails_closed() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save_word("cat", Some(PIXEL)).unwrap();

        let err = store
            .import_str(r#"{"version":"1.0"}"#, ImportMode::Replace)
            .unwrap_err();
        assert!(matches!(err, WordbeamError::Format(_)));
        assert_eq!(store.get_image("cat").as_deref(), Some(PIXEL));
    }

    #[test]
    fn stats_count_words_and_serialized_size() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save_word("cat", Some(PIXEL)).unwrap();
        let stats = store.stats();
        assert_eq!(stats.word_count, 1);
        assert!(stats.estimated_size_bytes > PIXEL.len());
    }
}
