//! Storage abstraction for persisted templates.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::element::ElementRecord;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for templates.
pub type TemplateId = Uuid;

/// Identifier of the user owning a template.
pub type UserId = Uuid;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Template not found: {0}")]
    NotFound(TemplateId),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Transaction failed: {0}")]
    Transaction(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async storage operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Scalar fields of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMeta {
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
}

impl TemplateMeta {
    pub fn new(name: impl Into<String>, is_public: bool) -> Self {
        Self {
            name: name.into(),
            is_public,
        }
    }
}

/// A template with its full element set, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    #[serde(flatten)]
    pub meta: TemplateMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    /// Elements in insertion order.
    #[serde(default)]
    pub elements: Vec<ElementRecord>,
}

impl TemplateRecord {
    fn summary(&self, id: TemplateId) -> TemplateSummary {
        TemplateSummary {
            id,
            name: self.meta.name.clone(),
            is_public: self.meta.is_public,
            owner_id: self.owner_id,
            element_count: self.elements.len(),
        }
    }
}

/// Listing entry for a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: TemplateId,
    pub name: String,
    pub is_public: bool,
    pub owner_id: Option<UserId>,
    pub element_count: usize,
}

/// Which templates a listing returns.
///
/// With an owner, that owner's templates are returned, plus every public
/// template when `include_public` is set. Without an owner every template is
/// returned; public ones are already part of that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    pub owner: Option<UserId>,
    pub include_public: bool,
}

impl TemplateFilter {
    /// Every stored template.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            include_public: false,
        }
    }

    pub fn with_public(mut self) -> Self {
        self.include_public = true;
        self
    }

    pub fn matches(&self, record: &TemplateRecord) -> bool {
        match self.owner {
            Some(owner) => {
                record.owner_id == Some(owner) || (self.include_public && record.meta.is_public)
            }
            None => true,
        }
    }
}

/// Sort summaries by name, then id, so listings are deterministic.
fn sort_summaries(summaries: &mut [TemplateSummary]) {
    summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}

/// Trait for template storage backends.
///
/// `replace_elements` must be all-or-nothing: either the scalar fields and
/// the complete new element list are stored, or nothing changes. Deleting a
/// template removes its elements with it.
pub trait TemplateStorage: Send + Sync {
    /// Fetch a template and all of its elements, in insertion order.
    fn get_template(&self, id: TemplateId) -> BoxFuture<'_, StorageResult<TemplateRecord>>;

    /// Create an empty template and return its id.
    fn create_template(
        &self,
        meta: &TemplateMeta,
        owner: Option<UserId>,
    ) -> BoxFuture<'_, StorageResult<TemplateId>>;

    /// Atomically update the scalar fields and replace every element.
    ///
    /// An empty `elements` slice removes all elements.
    fn replace_elements(
        &self,
        id: TemplateId,
        meta: &TemplateMeta,
        elements: &[ElementRecord],
    ) -> BoxFuture<'_, StorageResult<()>>;

    /// Delete a template together with its elements.
    fn delete_template(&self, id: TemplateId) -> BoxFuture<'_, StorageResult<()>>;

    /// Summaries of the templates matching `filter`.
    fn list_templates(
        &self,
        filter: &TemplateFilter,
    ) -> BoxFuture<'_, StorageResult<Vec<TemplateSummary>>>;
}
