//! File-based storage implementation.

use super::{
    BoxFuture, StorageError, StorageResult, TemplateFilter, TemplateId, TemplateMeta,
    TemplateRecord, TemplateStorage, TemplateSummary, UserId, sort_summaries,
};
use crate::element::ElementRecord;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File-based storage.
///
/// Each template is one JSON document holding its scalar fields and its
/// elements, so deleting the file removes the elements with it. Writes go to
/// a temporary sibling file that is renamed over the existing one, which makes
/// every replacement all-or-nothing.
pub struct FileStorage {
    /// Base directory for template documents.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/templatekit/templates/`
    /// On Windows: `%LOCALAPPDATA%\templatekit\templates\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("templatekit").join("templates"))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn template_path(&self, id: TemplateId) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    fn read(&self, id: TemplateId) -> StorageResult<TemplateRecord> {
        let path = self.template_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound(id));
        }
        read_record(&path)
    }

    fn write(&self, id: TemplateId, record: &TemplateRecord) -> StorageResult<()> {
        let path = self.template_path(id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        fs::write(&tmp, json).map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            // Leave the previous document untouched.
            let _ = fs::remove_file(&tmp);
            StorageError::Transaction(format!("Failed to commit {}: {}", path.display(), e))
        })
    }
}

fn read_record(path: &Path) -> StorageResult<TemplateRecord> {
    let json = fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json).map_err(|e| {
        StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
    })
}

impl TemplateStorage for FileStorage {
    fn get_template(&self, id: TemplateId) -> BoxFuture<'_, StorageResult<TemplateRecord>> {
        Box::pin(async move { self.read(id) })
    }

    fn create_template(
        &self,
        meta: &TemplateMeta,
        owner: Option<UserId>,
    ) -> BoxFuture<'_, StorageResult<TemplateId>> {
        let record = TemplateRecord {
            meta: meta.clone(),
            owner_id: owner,
            elements: Vec::new(),
        };
        Box::pin(async move {
            let id = Uuid::new_v4();
            self.write(id, &record)?;
            Ok(id)
        })
    }

    fn replace_elements(
        &self,
        id: TemplateId,
        meta: &TemplateMeta,
        elements: &[ElementRecord],
    ) -> BoxFuture<'_, StorageResult<()>> {
        let meta = meta.clone();
        let elements = elements.to_vec();
        Box::pin(async move {
            let mut record = self.read(id)?;
            record.meta = meta;
            record.elements = elements;
            self.write(id, &record)
        })
    }

    fn delete_template(&self, id: TemplateId) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.template_path(id);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }

    fn list_templates(
        &self,
        filter: &TemplateFilter,
    ) -> BoxFuture<'_, StorageResult<Vec<TemplateSummary>>> {
        let filter = *filter;
        Box::pin(async move {
            let entries = fs::read_dir(&self.base_path)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut summaries = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e != "json").unwrap_or(true) {
                    continue;
                }
                let Some(id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| Uuid::parse_str(s).ok())
                else {
                    continue;
                };
                match read_record(&path) {
                    Ok(record) if filter.matches(&record) => summaries.push(record.summary(id)),
                    Ok(_) => {}
                    Err(e) => log::warn!("Skipping unreadable template: {}", e),
                }
            }
            sort_summaries(&mut summaries);
            Ok(summaries)
        })
    }
}
