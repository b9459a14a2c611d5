//! Asset uploads for logo and image elements.

use crate::element::{AssetRef, ElementContent, ElementId, ElementKind};
use crate::layout::{ElementPatch, LayoutError, LayoutStore};
use crate::storage::BoxFuture;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0} elements do not take uploads")]
    UnsupportedKind(ElementKind),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Upload failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// A file picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Trait for upload backends. Returns a reference to the stored asset.
pub trait Uploader {
    fn upload<'a>(&'a self, file: &'a UploadFile) -> BoxFuture<'a, Result<AssetRef, UploadError>>;
}

/// Keeps uploaded bytes in memory and hands out `memory://` references.
#[derive(Default)]
pub struct MemoryUploader {
    assets: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored under a reference returned by [`Uploader::upload`].
    pub fn get(&self, asset: &AssetRef) -> Option<Vec<u8>> {
        self.assets.read().ok()?.get(&asset.url).cloned()
    }

    pub fn len(&self) -> usize {
        self.assets.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Uploader for MemoryUploader {
    fn upload<'a>(&'a self, file: &'a UploadFile) -> BoxFuture<'a, Result<AssetRef, UploadError>> {
        Box::pin(async move {
            let url = format!("memory://{}/{}", Uuid::new_v4(), file.name);
            let mut assets = self
                .assets
                .write()
                .map_err(|e| UploadError::Failed(format!("Lock error: {}", e)))?;
            assets.insert(url.clone(), file.bytes.clone());
            Ok(AssetRef::new(url))
        })
    }
}

/// Check that `file` may be attached to an element of `kind`.
pub fn validate(kind: ElementKind, file: &UploadFile) -> Result<(), UploadError> {
    if !kind.accepts_upload() {
        return Err(UploadError::UnsupportedKind(kind));
    }
    if !file.is_image() {
        return Err(UploadError::UnsupportedMediaType(file.mime_type.clone()));
    }
    Ok(())
}

/// Validate `file` for an element of `kind` and upload it.
///
/// The store is not borrowed while the upload runs, so gestures keep working.
/// Hand the returned reference to [`apply_asset`] once it arrives.
pub async fn upload_asset<U: Uploader + ?Sized>(
    uploader: &U,
    kind: ElementKind,
    file: &UploadFile,
) -> Result<AssetRef, UploadError> {
    validate(kind, file)?;

    match uploader.upload(file).await {
        Ok(asset) => Ok(asset),
        Err(e) => {
            log::error!("Upload of {} failed: {}", file.name, e);
            Err(e)
        }
    }
}

/// Point an element's content at an uploaded asset.
///
/// Returns `false` when the element was removed while the upload was
/// pending; the store is left alone in that case.
pub fn apply_asset(
    store: &mut LayoutStore,
    id: ElementId,
    asset: AssetRef,
) -> Result<bool, UploadError> {
    let Some(element) = store.get(id) else {
        log::debug!("Element {} removed before its upload finished", id);
        return Ok(false);
    };
    let content = match element.kind() {
        ElementKind::Logo => ElementContent::Logo(Some(asset)),
        ElementKind::Image => ElementContent::Image(Some(asset)),
        other => return Err(UploadError::UnsupportedKind(other)),
    };
    store.update_by_id(id, ElementPatch::new().content(content))?;
    log::info!("Attached asset to element {}", id);
    Ok(true)
}
