//! Layout store: the ordered element sequence of one template.

use crate::element::{Element, ElementContent, ElementId, ElementRecord, KindMismatch};
use kurbo::{Point, Size};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by layout mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Element already in layout: {0}")]
    DuplicateId(ElementId),
    #[error("Element not found: {0}")]
    NotFound(ElementId),
    #[error("Index {index} out of range for {len} elements")]
    IndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    ContentMismatch(#[from] KindMismatch),
}

/// Partial update applied by [`LayoutStore::update_by_id`].
///
/// Unset fields are left alone. Sizes are clamped like any other resize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    pub content: Option<ElementContent>,
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub row_order: Option<i32>,
}

impl ElementPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: ElementContent) -> Self {
        self.content = Some(content);
        self
    }

    pub fn position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn row_order(mut self, row_order: i32) -> Self {
        self.row_order = Some(row_order);
        self
    }

    /// Whether the patch leaves every field alone.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.position.is_none()
            && self.size.is_none()
            && self.row_order.is_none()
    }

    /// Apply to an element. Nothing changes if the content kind is wrong.
    fn apply(self, element: &mut Element) -> Result<(), KindMismatch> {
        if let Some(content) = self.content {
            element.set_content(content)?;
        }
        if let Some(position) = self.position {
            element.set_position(position);
        }
        if let Some(size) = self.size {
            element.set_size(size);
        }
        if let Some(row_order) = self.row_order {
            element.set_row_order(row_order);
        }
        Ok(())
    }
}

/// Immutable copy of a layout, taken for rendering or persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSnapshot {
    pub name: String,
    pub is_public: bool,
    pub elements: Arc<[Element]>,
    /// Store revision the snapshot was taken at.
    pub revision: u64,
}

impl LayoutSnapshot {
    /// Element records in sequence order.
    pub fn to_records(&self) -> Vec<ElementRecord> {
        self.elements.iter().map(Element::to_record).collect()
    }
}

/// Ordered element collection for one template, plus its metadata.
///
/// Every successful mutation bumps the revision counter, which lets a
/// persistence layer tell whether the store changed since a snapshot.
#[derive(Debug, Clone, Default)]
pub struct LayoutStore {
    name: String,
    is_public: bool,
    elements: Vec<Element>,
    revision: u64,
}

impl LayoutStore {
    /// Create an empty, private, unnamed layout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.bump();
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn set_public(&mut self, is_public: bool) {
        self.is_public = is_public;
        self.bump();
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Append an element.
    pub fn add(&mut self, element: Element) -> Result<(), LayoutError> {
        if self.contains(element.id()) {
            return Err(LayoutError::DuplicateId(element.id()));
        }
        self.elements.push(element);
        self.bump();
        Ok(())
    }

    /// Remove one element, returning it.
    pub fn remove(&mut self, id: ElementId) -> Result<Element, LayoutError> {
        let index = self.index_of(id).ok_or(LayoutError::NotFound(id))?;
        let element = self.elements.remove(index);
        self.bump();
        Ok(element)
    }

    /// Remove every element.
    pub fn remove_all(&mut self) {
        self.elements.clear();
        self.bump();
    }

    /// Replace metadata and elements in one step.
    ///
    /// The whole batch is validated first; on a duplicate id the store is
    /// left exactly as it was.
    pub fn replace_all(
        &mut self,
        name: impl Into<String>,
        is_public: bool,
        elements: Vec<Element>,
    ) -> Result<(), LayoutError> {
        let mut seen = HashSet::with_capacity(elements.len());
        for element in &elements {
            if !seen.insert(element.id()) {
                return Err(LayoutError::DuplicateId(element.id()));
            }
        }
        self.name = name.into();
        self.is_public = is_public;
        self.elements = elements;
        self.bump();
        Ok(())
    }

    /// Drop every element and reset the metadata to an unnamed private layout.
    pub fn clear(&mut self) {
        self.name.clear();
        self.is_public = false;
        self.elements.clear();
        self.bump();
    }

    /// Apply a partial update to the element with the given id.
    pub fn update_by_id(&mut self, id: ElementId, patch: ElementPatch) -> Result<(), LayoutError> {
        let element = self
            .elements
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or(LayoutError::NotFound(id))?;
        if patch.is_empty() {
            return Ok(());
        }
        patch.apply(element)?;
        self.bump();
        Ok(())
    }

    /// Move the element at `from` so that it ends up at `to`.
    ///
    /// Elements between the two positions shift by one to close the gap.
    pub fn move_to_index(&mut self, from: usize, to: usize) -> Result<(), LayoutError> {
        let len = self.elements.len();
        for index in [from, to] {
            if index >= len {
                return Err(LayoutError::IndexOutOfRange { index, len });
            }
        }
        if from != to {
            let element = self.elements.remove(from);
            self.elements.insert(to, element);
            self.bump();
        }
        Ok(())
    }

    /// Take an immutable copy of the current state.
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            name: self.name.clone(),
            is_public: self.is_public,
            elements: self.elements.iter().cloned().collect(),
            revision: self.revision,
        }
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Sequence index of an element.
    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    /// Elements in sequence order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Topmost element under a canvas point. Later elements paint on top.
    pub fn element_at(&self, point: Point) -> Option<ElementId> {
        self.elements
            .iter()
            .rev()
            .find(|e| e.bounds().contains(point))
            .map(Element::id)
    }

    /// Element ids grouped by `row_order`, rows ascending.
    ///
    /// Within a row, ids keep their sequence order.
    pub fn rows(&self) -> Vec<(i32, Vec<ElementId>)> {
        let mut rows: BTreeMap<i32, Vec<ElementId>> = BTreeMap::new();
        for element in &self.elements {
            rows.entry(element.row_order()).or_default().push(element.id());
        }
        rows.into_iter().collect()
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}
