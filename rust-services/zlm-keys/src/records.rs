//! Durable, named and versioned JSON records
//!
//! Every piece of persistent lock manager state lives in one of a few small
//! records. A record is always replaced as a whole; readers never observe a
//! half-written record.
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::error::RecordError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

/// On-disk envelope of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub version: u32,
    pub key: String,
    pub data: serde_json::Value,
}

/// Trait for durable record backends
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read a record; `None` when it was never written
    async fn load(&self, name: &str) -> Result<Option<VersionedRecord>, RecordError>;

    /// Replace a record atomically
    async fn save(
        &self,
        name: &str,
        version: u32,
        data: &serde_json::Value,
    ) -> Result<(), RecordError>;

    /// Delete a record; deleting a missing record succeeds
    async fn remove(&self, name: &str) -> Result<(), RecordError>;

    /// Read a record's data, refusing versions newer than `supported`
    async fn load_data(
        &self,
        name: &str,
        supported: u32,
    ) -> Result<Option<serde_json::Value>, RecordError> {
        match self.load(name).await? {
            None => Ok(None),
            Some(record) if record.version > supported => Err(RecordError::UnsupportedVersion {
                name: name.to_string(),
                found: record.version,
                supported,
            }),
            Some(record) => Ok(Some(record.data)),
        }
    }
}

/// One JSON file per record inside a private directory
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    /// Open (and create if needed) the record directory
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self, RecordError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        restrict_permissions(&root, 0o700).await?;

        debug!(path = %root.display(), "Record store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, name: &str) -> PathBuf {
        // Sanitize record name for filesystem
        let sanitized = name.replace(['/', '\\'], "_");
        self.root.join(format!("{}.json", sanitized))
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn load(&self, name: &str) -> Result<Option<VersionedRecord>, RecordError> {
        let path = self.record_path(name);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Records are only ever replaced by rename, so an empty file is damage
        if content.trim().is_empty() {
            return Err(RecordError::Corrupt(format!("{} is empty", path.display())));
        }

        let record = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    async fn save(
        &self,
        name: &str,
        version: u32,
        data: &serde_json::Value,
    ) -> Result<(), RecordError> {
        let record = VersionedRecord {
            version,
            key: name.to_string(),
            data: data.clone(),
        };
        let json = serde_json::to_vec_pretty(&record)?;

        let path = self.record_path(name);
        let tmp_path = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path).await?;
        restrict_permissions(&tmp_path, 0o600).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        // Rename is atomic on the same filesystem
        fs::rename(&tmp_path, &path).await?;

        debug!(record = name, "Record saved");
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), RecordError> {
        match fs::remove_file(self.record_path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path, mode: u32) -> Result<(), RecordError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path, _mode: u32) -> Result<(), RecordError> {
    Ok(())
}

/// Volatile record store, for tests and dry runs
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, VersionedRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a record in place verbatim, bypassing `save`
    pub async fn insert_raw(&self, record: VersionedRecord) {
        let mut records = self.records.write().await;
        records.insert(record.key.clone(), record);
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.records.read().await.contains_key(name)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load(&self, name: &str) -> Result<Option<VersionedRecord>, RecordError> {
        Ok(self.records.read().await.get(name).cloned())
    }

    async fn save(
        &self,
        name: &str,
        version: u32,
        data: &serde_json::Value,
    ) -> Result<(), RecordError> {
        let mut records = self.records.write().await;
        records.insert(
            name.to_string(),
            VersionedRecord {
                version,
                key: name.to_string(),
                data: data.clone(),
            },
        );
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), RecordError> {
        self.records.write().await.remove(name);
        Ok(())
    }
}
