//! In-memory storage implementation.

use super::{
    BoxFuture, StorageError, StorageResult, TemplateFilter, TemplateId, TemplateMeta,
    TemplateRecord, TemplateStorage, TemplateSummary, UserId, sort_summaries,
};
use crate::element::ElementRecord;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory storage for testing and ephemeral use.
///
/// Replacements happen under a single write lock, so readers see either the
/// old or the new element set.
#[derive(Default)]
pub struct MemoryStorage {
    templates: RwLock<HashMap<TemplateId, TemplateRecord>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored templates.
    pub fn len(&self) -> usize {
        self.templates.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl TemplateStorage for MemoryStorage {
    fn get_template(&self, id: TemplateId) -> BoxFuture<'_, StorageResult<TemplateRecord>> {
        Box::pin(async move {
            let templates = self.templates.read().map_err(lock_error)?;
            templates.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
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
            let mut templates = self.templates.write().map_err(lock_error)?;
            let id = Uuid::new_v4();
            templates.insert(id, record);
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
            let mut templates = self.templates.write().map_err(lock_error)?;
            let record = templates.get_mut(&id).ok_or(StorageError::NotFound(id))?;
            record.meta = meta;
            record.elements = elements;
            Ok(())
        })
    }

    fn delete_template(&self, id: TemplateId) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut templates = self.templates.write().map_err(lock_error)?;
            templates.remove(&id);
            Ok(())
        })
    }

    fn list_templates(
        &self,
        filter: &TemplateFilter,
    ) -> BoxFuture<'_, StorageResult<Vec<TemplateSummary>>> {
        let filter = *filter;
        Box::pin(async move {
            let templates = self.templates.read().map_err(lock_error)?;
            let mut summaries: Vec<_> = templates
                .iter()
                .filter(|(_, record)| filter.matches(record))
                .map(|(&id, record)| record.summary(id))
                .collect();
            sort_summaries(&mut summaries);
            Ok(summaries)
        })
    }
}
