//! Persistence synchronizer.
//!
//! Moves whole layouts between a [`LayoutStore`] and a [`TemplateStorage`]
//! backend. A load replaces the store contents, and a save writes a snapshot
//! back through a single replace-all call.

use crate::element::{Element, ElementRecord};
use crate::layout::{LayoutError, LayoutSnapshot, LayoutStore};
use crate::storage::{
    StorageError, TemplateFilter, TemplateId, TemplateMeta, TemplateStorage, TemplateSummary,
    UserId,
};
use std::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by load and save.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Template not found: {0}")]
    NotFound(TemplateId),
    #[error("A save is already in progress")]
    SaveInProgress,
    #[error(transparent)]
    Storage(StorageError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => SyncError::NotFound(id),
            other => SyncError::Storage(other),
        }
    }
}

/// Marks a save as in flight for as long as it lives.
struct SaveGuard<'a>(&'a Cell<bool>);

impl<'a> SaveGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Loads and saves one editing session's layout.
///
/// Only one save may be in flight at a time. Edits made to the store while a
/// save is suspended are not part of that save; they are picked up by the
/// next one.
pub struct Synchronizer<S: TemplateStorage> {
    /// Storage backend.
    storage: Arc<S>,
    /// Owner recorded on templates created by this session.
    owner: Option<UserId>,
    /// Whether a save is currently suspended.
    saving: Cell<bool>,
    /// Store revision at the last successful load or save.
    saved_revision: Cell<Option<u64>>,
}

impl<S: TemplateStorage> Synchronizer<S> {
    /// Create a synchronizer over the given storage backend.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            owner: None,
            saving: Cell::new(false),
            saved_revision: Cell::new(None),
        }
    }

    /// Record `owner` on every template this session creates.
    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    /// Whether a save is suspended right now.
    pub fn is_saving(&self) -> bool {
        self.saving.get()
    }

    /// Whether the store changed since the last successful load or save.
    pub fn is_dirty(&self, store: &LayoutStore) -> bool {
        store.revision() != self.saved_revision.get().unwrap_or(0)
    }

    /// Replace the store contents with a persisted template.
    ///
    /// On any failure the store is left empty.
    pub async fn load(&self, id: TemplateId, store: &mut LayoutStore) -> Result<(), SyncError> {
        match self.fetch(id).await {
            Ok((meta, elements)) => {
                let count = elements.len();
                store.replace_all(meta.name, meta.is_public, elements)?;
                self.saved_revision.set(Some(store.revision()));
                log::info!("Loaded template {} ({} elements)", id, count);
                Ok(())
            }
            Err(e) => {
                store.clear();
                self.saved_revision.set(Some(store.revision()));
                log::error!("Failed to load template {}: {}", id, e);
                Err(e)
            }
        }
    }

    async fn fetch(&self, id: TemplateId) -> Result<(TemplateMeta, Vec<Element>), SyncError> {
        let record = self.storage.get_template(id).await?;
        let elements = decode_elements(record.elements)?;
        Ok((record.meta, elements))
    }

    /// Persist a snapshot.
    ///
    /// With an id, the template's metadata and elements are replaced in one
    /// atomic call. Without one, a new template is created and its id
    /// returned. A failed save leaves the previously persisted data as it
    /// was, and the caller's store untouched for a retry.
    pub async fn save(
        &self,
        id: Option<TemplateId>,
        snapshot: &LayoutSnapshot,
    ) -> Result<TemplateId, SyncError> {
        let Some(_guard) = SaveGuard::acquire(&self.saving) else {
            log::warn!("Save refused: another save is in progress");
            return Err(SyncError::SaveInProgress);
        };

        let meta = TemplateMeta::new(snapshot.name.clone(), snapshot.is_public);
        let records = snapshot.to_records();
        let result = match id {
            Some(id) => self.replace(id, &meta, &records).await,
            None => self.create(&meta, &records).await,
        };

        match result {
            Ok(id) => {
                self.saved_revision.set(Some(snapshot.revision));
                log::info!("Saved template {} ({} elements)", id, records.len());
                Ok(id)
            }
            Err(e) => {
                log::error!("Failed to save template: {}", e);
                Err(e)
            }
        }
    }

    async fn replace(
        &self,
        id: TemplateId,
        meta: &TemplateMeta,
        records: &[ElementRecord],
    ) -> Result<TemplateId, SyncError> {
        self.storage.replace_elements(id, meta, records).await?;
        Ok(id)
    }

    async fn create(
        &self,
        meta: &TemplateMeta,
        records: &[ElementRecord],
    ) -> Result<TemplateId, SyncError> {
        let id = self.storage.create_template(meta, self.owner).await?;
        if let Err(e) = self.storage.replace_elements(id, meta, records).await {
            // No partially written template may survive.
            if let Err(cleanup) = self.storage.delete_template(id).await {
                log::error!("Failed to remove incomplete template {}: {}", id, cleanup);
            }
            return Err(e.into());
        }
        Ok(id)
    }

    /// Delete a template. Its elements go with it.
    pub async fn delete(&self, id: TemplateId) -> Result<(), SyncError> {
        self.storage.delete_template(id).await?;
        log::info!("Deleted template {}", id);
        Ok(())
    }

    /// Summaries of the templates matching `filter`.
    pub async fn list(&self, filter: &TemplateFilter) -> Result<Vec<TemplateSummary>, SyncError> {
        Ok(self.storage.list_templates(filter).await?)
    }
}

/// Decode persisted records in order.
///
/// Missing or repeated ids are replaced with fresh ones so the store's
/// uniqueness invariant holds for any stored data.
fn decode_elements(records: Vec<ElementRecord>) -> Result<Vec<Element>, StorageError> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .map(|record| {
            let mut element = Element::from_record(record)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            if !seen.insert(element.id()) {
                log::warn!("Duplicate element id {} in stored template", element.id());
                element = element.with_id(Uuid::new_v4());
                seen.insert(element.id());
            }
            Ok(element)
        })
        .collect()
}
