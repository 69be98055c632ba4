//! Document persistence: one JSON record per document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::fs;
use tokio::fs::try_exists;

use crate::config::StorageConfig;
use crate::document::DEFAULT_TITLE;
use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    /// Serialized block tree (older records hold HTML)
    pub content: String,
    pub last_modified: i64,
    /// Older records were written without one
    #[serde(default)]
    pub font_family: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub last_modified: i64,
}

impl From<&DocumentRecord> for DocumentSummary {
    fn from(record: &DocumentRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            last_modified: record.last_modified,
        }
    }
}

/// A document to persist. Without an id the store assigns one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub font_family: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Newest first.
    async fn list(&self) -> Result<Vec<DocumentSummary>, StorageError>;
    async fn load(&self, id: &str) -> Result<DocumentRecord, StorageError>;
    /// Create or overwrite a record and return it as stored.
    async fn save(&self, request: SaveRequest) -> Result<DocumentRecord, StorageError>;
    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn stored_title(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title.to_string()
    }
}

/// Ids double as file names.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Stores each document as `<id>.json` in one directory.
pub struct FileStore {
    dir: PathBuf,
    last_issued: Mutex<i64>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_issued: Mutex::new(0),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Ok(Self::new(Self::documents_dir(config)?))
    }

    fn documents_dir(config: &StorageConfig) -> Result<PathBuf, StorageError> {
        if let Some(dir) = &config.data_dir {
            return Ok(dir.join("documents"));
        }
        if let Ok(dir) = std::env::var("QUILLPAD_DATA_DIR") {
            return Ok(PathBuf::from(dir).join("documents"));
        }
        let dirs = directories::ProjectDirs::from("com", "quillpad", "quillpad").ok_or_else(|| {
            StorageError::Unavailable("データディレクトリを特定できませんでした".to_string())
        })?;
        Ok(dirs.data_dir().join("documents"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    async fn read_record(path: &Path) -> Result<DocumentRecord, StorageError> {
        let json = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Millisecond timestamp ids, bumped past anything already issued or
    /// already on disk.
    async fn next_id(&self) -> Result<String, StorageError> {
        loop {
            let candidate = {
                let mut last = self
                    .last_issued
                    .lock()
                    .map_err(|_| StorageError::Unavailable("id generator poisoned".to_string()))?;
                *last = now_millis().max(*last + 1);
                *last
            };
            let id = candidate.to_string();
            if !try_exists(self.record_path(&id)).await? {
                return Ok(id);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn list(&self) -> Result<Vec<DocumentSummary>, StorageError> {
        if !try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        let mut dir_entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir_entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(record) => documents.push(DocumentSummary::from(&record)),
                Err(e) => log::warn!("Skipping unreadable document {}: {}", path.display(), e),
            }
        }

        documents.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(documents)
    }

    async fn load(&self, id: &str) -> Result<DocumentRecord, StorageError> {
        if !is_valid_id(id) {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let path = self.record_path(id);
        if !try_exists(&path).await? {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let record = Self::read_record(&path).await?;
        log::info!("Loaded document '{}' from {}", id, path.display());
        Ok(record)
    }

    async fn save(&self, request: SaveRequest) -> Result<DocumentRecord, StorageError> {
        fs::create_dir_all(&self.dir).await?;

        let mut last_modified = now_millis();
        let id = match request.id {
            Some(id) => {
                if !is_valid_id(&id) {
                    return Err(StorageError::Unavailable(format!("無効なドキュメントID: {}", id)));
                }
                let path = self.record_path(&id);
                if try_exists(&path).await? {
                    if let Ok(previous) = Self::read_record(&path).await {
                        last_modified = last_modified.max(previous.last_modified);
                    }
                }
                id
            }
            None => self.next_id().await?,
        };

        let record = DocumentRecord {
            id,
            title: stored_title(&request.title),
            content: request.content,
            last_modified,
            font_family: request.font_family,
        };
        let path = self.record_path(&record.id);
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json).await?;

        log::info!("Saved document '{}' to {}", record.id, path.display());
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let path = self.record_path(id);
        if !is_valid_id(id) || !try_exists(&path).await? {
            return Err(StorageError::NotFound(id.to_string()));
        }
        fs::remove_file(&path).await?;
        log::info!("Deleted document '{}'", id);
        Ok(())
    }
}

/// In-process store. Counts saves and can be told to fail or to stall,
/// which is what the session tests lean on.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, DocumentRecord>>,
    saves: Mutex<Vec<SaveRequest>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    save_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save sleeps this long before it lands.
    pub fn with_save_delay(delay: Duration) -> Self {
        Self {
            save_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|saves| saves.len()).unwrap_or(0)
    }

    pub fn save_requests(&self) -> Vec<SaveRequest> {
        self.saves.lock().map(|saves| saves.clone()).unwrap_or_default()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn insert(&self, record: DocumentRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(record.id.clone(), record);
        }
    }

    fn unavailable(_: impl std::fmt::Display) -> StorageError {
        StorageError::Unavailable("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self) -> Result<Vec<DocumentSummary>, StorageError> {
        let records = self.records.lock().map_err(Self::unavailable)?;
        let mut documents: Vec<DocumentSummary> = records.values().map(DocumentSummary::from).collect();
        documents.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(documents)
    }

    async fn load(&self, id: &str) -> Result<DocumentRecord, StorageError> {
        let records = self.records.lock().map_err(Self::unavailable)?;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn save(&self, request: SaveRequest) -> Result<DocumentRecord, StorageError> {
        self.saves.lock().map_err(Self::unavailable)?.push(request.clone());
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage offline".to_string()));
        }

        let mut records = self.records.lock().map_err(Self::unavailable)?;
        let id = request
            .id
            .unwrap_or_else(|| format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1));
        let previous = records.get(&id).map(|record| record.last_modified).unwrap_or(0);
        let record = DocumentRecord {
            id: id.clone(),
            title: stored_title(&request.title),
            content: request.content,
            last_modified: now_millis().max(previous),
            font_family: request.font_family,
        };
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let mut records = self.records.lock().map_err(Self::unavailable)?;
        records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}
