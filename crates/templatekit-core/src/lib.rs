//! TemplateKit Core Library
//!
//! Layout model, gesture handling and persistence for a drag-and-drop
//! document template editor.

pub mod element;
pub mod input;
pub mod interaction;
pub mod layout;
pub mod storage;
pub mod sync;
pub mod upload;

pub use element::{AssetRef, Element, ElementContent, ElementId, ElementKind, ElementRecord};
pub use input::{DropTarget, InputEvent, NoCapture, PointerCapture};
pub use interaction::{Effect, GestureState, InteractionController};
pub use layout::{ElementPatch, LayoutError, LayoutSnapshot, LayoutStore};
pub use storage::{FileStorage, MemoryStorage, StorageError, TemplateFilter, TemplateId, TemplateStorage};
pub use sync::{SyncError, Synchronizer};
pub use upload::{MemoryUploader, UploadError, UploadFile, Uploader, apply_asset, upload_asset};
