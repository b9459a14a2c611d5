//! Template elements: the items placed on the canvas.
//!
//! An [`Element`] couples a typed content payload with its canvas geometry
//! (position, size) and a logical row hint. The element kind is carried by the
//! content variant, so it cannot drift away from the payload it describes.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Smallest width an element can be resized to.
pub const MIN_WIDTH: f64 = 100.0;
/// Smallest height an element can be resized to.
pub const MIN_HEIGHT: f64 = 50.0;
/// Default width for every element kind.
pub const DEFAULT_WIDTH: f64 = 200.0;
/// Default height for text blocks.
pub const TEXT_DEFAULT_HEIGHT: f64 = 100.0;
/// Default height for every non-text kind.
pub const MEDIA_DEFAULT_HEIGHT: f64 = 150.0;
/// Height of one logical row when deriving `row_order` from a drop point.
pub const ROW_HEIGHT: f64 = 150.0;

/// Unique identifier for elements.
pub type ElementId = Uuid;

/// The closed set of element types offered by the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Logo,
    Text,
    Image,
    Signature,
    Table,
}

impl ElementKind {
    /// Every kind, in palette order.
    pub const ALL: [ElementKind; 5] = [
        ElementKind::Logo,
        ElementKind::Text,
        ElementKind::Image,
        ElementKind::Signature,
        ElementKind::Table,
    ];

    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Logo => "logo",
            ElementKind::Text => "text",
            ElementKind::Image => "image",
            ElementKind::Signature => "signature",
            ElementKind::Table => "table",
        }
    }

    /// Palette label.
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::Logo => "Company Logo",
            ElementKind::Text => "Text Block",
            ElementKind::Image => "Image",
            ElementKind::Signature => "Signature",
            ElementKind::Table => "Table",
        }
    }

    /// Size given to a freshly created element of this kind.
    pub fn default_size(&self) -> Size {
        match self {
            ElementKind::Text => Size::new(DEFAULT_WIDTH, TEXT_DEFAULT_HEIGHT),
            _ => Size::new(DEFAULT_WIDTH, MEDIA_DEFAULT_HEIGHT),
        }
    }

    /// Whether content of this kind is an uploaded asset reference.
    pub fn accepts_upload(&self) -> bool {
        matches!(self, ElementKind::Logo | ElementKind::Image)
    }

    /// Content of a newly dropped element.
    pub fn empty_content(&self) -> ElementContent {
        match self {
            ElementKind::Logo => ElementContent::Logo(None),
            ElementKind::Text => ElementContent::Text(String::new()),
            ElementKind::Image => ElementContent::Image(None),
            ElementKind::Signature => ElementContent::Signature(Value::String(String::new())),
            ElementKind::Table => ElementContent::Table(Value::String(String::new())),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Reference to an uploaded asset. Raw bytes never live in an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub url: String,
}

impl AssetRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Type-specific content payload.
///
/// Logo and image content is an optional asset reference (`None` until an
/// upload succeeds). Signature and table payloads are stored and forwarded
/// without interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementContent {
    Logo(Option<AssetRef>),
    Text(String),
    Image(Option<AssetRef>),
    Signature(Value),
    Table(Value),
}

impl ElementContent {
    /// The element kind this content belongs to.
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementContent::Logo(_) => ElementKind::Logo,
            ElementContent::Text(_) => ElementKind::Text,
            ElementContent::Image(_) => ElementKind::Image,
            ElementContent::Signature(_) => ElementKind::Signature,
            ElementContent::Table(_) => ElementKind::Table,
        }
    }

    /// Asset reference, for logo and image content that has one.
    pub fn asset(&self) -> Option<&AssetRef> {
        match self {
            ElementContent::Logo(asset) | ElementContent::Image(asset) => asset.as_ref(),
            _ => None,
        }
    }

    /// Encode as the persisted JSON value.
    ///
    /// An asset-less logo or image is written as the empty string, the same
    /// placeholder a fresh palette drop carries.
    pub fn to_value(&self) -> Value {
        match self {
            ElementContent::Logo(asset) | ElementContent::Image(asset) => match asset {
                Some(asset) => serde_json::json!({ "url": asset.url }),
                None => Value::String(String::new()),
            },
            ElementContent::Text(text) => Value::String(text.clone()),
            ElementContent::Signature(value) | ElementContent::Table(value) => value.clone(),
        }
    }

    /// Decode a persisted JSON value for the given kind.
    pub fn from_value(kind: ElementKind, value: Value) -> Result<Self, ContentError> {
        let invalid = |reason: &str| ContentError {
            kind,
            reason: reason.to_string(),
        };

        match kind {
            ElementKind::Logo | ElementKind::Image => {
                let asset = match value {
                    Value::Null => None,
                    Value::String(s) if s.is_empty() => None,
                    Value::Object(map) => match map.get("url") {
                        Some(Value::String(url)) => Some(AssetRef::new(url.clone())),
                        _ => return Err(invalid("expected a string `url` field")),
                    },
                    _ => return Err(invalid("expected `{url}` or an empty placeholder")),
                };
                Ok(if kind == ElementKind::Logo {
                    ElementContent::Logo(asset)
                } else {
                    ElementContent::Image(asset)
                })
            }
            ElementKind::Text => match value {
                Value::Null => Ok(ElementContent::Text(String::new())),
                Value::String(s) => Ok(ElementContent::Text(s)),
                _ => Err(invalid("expected plain text")),
            },
            ElementKind::Signature => Ok(ElementContent::Signature(value)),
            ElementKind::Table => Ok(ElementContent::Table(value)),
        }
    }
}

/// A persisted content value that does not fit its element kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} content: {reason}")]
pub struct ContentError {
    pub kind: ElementKind,
    pub reason: String,
}

/// Attempt to store content of one kind in an element of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot store {found} content in a {expected} element")]
pub struct KindMismatch {
    pub expected: ElementKind,
    pub found: ElementKind,
}

/// Clamp a size to the minimum element dimensions.
pub fn clamp_size(size: Size) -> Size {
    Size::new(size.width.max(MIN_WIDTH), size.height.max(MIN_HEIGHT))
}

/// Logical row for a drop at canvas height `y`.
pub fn row_for_y(y: f64) -> i32 {
    (y / ROW_HEIGHT).floor() as i32
}

/// One element placed on a template canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: ElementId,
    content: ElementContent,
    position: Point,
    size: Size,
    row_order: i32,
}

impl Element {
    /// Create an empty element of the given kind with default geometry.
    pub fn new(kind: ElementKind) -> Self {
        Self::from_content(kind.empty_content())
    }

    /// Create an element around existing content.
    pub fn from_content(content: ElementContent) -> Self {
        let size = content.kind().default_size();
        Self {
            id: Uuid::new_v4(),
            content,
            position: Point::ZERO,
            size,
            row_order: 0,
        }
    }

    pub fn with_id(mut self, id: ElementId) -> Self {
        self.id = id;
        self
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    /// Set the size, clamped to the minimum dimensions.
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = clamp_size(size);
        self
    }

    pub fn with_row_order(mut self, row_order: i32) -> Self {
        self.row_order = row_order;
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.content.kind()
    }

    pub fn content(&self) -> &ElementContent {
        &self.content
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn row_order(&self) -> i32 {
        self.row_order
    }

    /// Replace the content. The new content must be of the same kind.
    pub fn set_content(&mut self, content: ElementContent) -> Result<(), KindMismatch> {
        let found = content.kind();
        if found != self.kind() {
            return Err(KindMismatch {
                expected: self.kind(),
                found,
            });
        }
        self.content = content;
        Ok(())
    }

    /// Move the element. The canvas is unbounded, so any point is accepted.
    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    /// Resize the element, clamping to the minimum dimensions.
    pub fn set_size(&mut self, size: Size) {
        self.size = clamp_size(size);
    }

    pub fn set_row_order(&mut self, row_order: i32) {
        self.row_order = row_order;
    }

    /// Bounding box in canvas coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Encode as the persisted record.
    pub fn to_record(&self) -> ElementRecord {
        ElementRecord {
            id: Some(self.id),
            kind: self.kind(),
            content: self.content.to_value(),
            position: Some(self.position),
            size: Some(self.size),
            row_order: Some(self.row_order),
        }
    }

    /// Decode a persisted record, applying defaults for missing fields.
    ///
    /// Records without an id get a fresh one.
    pub fn from_record(record: ElementRecord) -> Result<Self, ContentError> {
        let content = ElementContent::from_value(record.kind, record.content)?;
        let mut element = Self::from_content(content)
            .with_position(record.position.unwrap_or(Point::ZERO))
            .with_row_order(record.row_order.unwrap_or(0));
        if let Some(size) = record.size {
            element = element.with_size(size);
        }
        if let Some(id) = record.id {
            element = element.with_id(id);
        }
        Ok(element)
    }
}

/// Persisted shape of one element: `{type, content, position, size, rowOrder}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ElementId>,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub row_order: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_geometry() {
        let text = Element::new(ElementKind::Text);
        assert_eq!(text.size(), Size::new(200.0, 100.0));
        assert_eq!(text.position(), Point::ZERO);
        assert_eq!(text.row_order(), 0);

        for kind in [ElementKind::Logo, ElementKind::Image, ElementKind::Signature, ElementKind::Table] {
            assert_eq!(Element::new(kind).size(), Size::new(200.0, 150.0));
        }
    }

    #[test]
    fn test_set_size_clamps() {
        let mut element = Element::new(ElementKind::Image);
        element.set_size(Size::new(-40.0, 10.0));
        assert_eq!(element.size(), Size::new(MIN_WIDTH, MIN_HEIGHT));

        element.set_size(Size::new(350.0, 75.0));
        assert_eq!(element.size(), Size::new(350.0, 75.0));
    }

    #[test]
    fn test_position_is_unbounded() {
        let mut element = Element::new(ElementKind::Table);
        element.set_position(Point::new(-500.0, 1e6));
        assert_eq!(element.position(), Point::new(-500.0, 1e6));
    }

    #[test]
    fn test_set_content_keeps_kind() {
        let mut element = Element::new(ElementKind::Text);
        let id = element.id();

        element.set_content(ElementContent::Text("Dear customer".into())).unwrap();
        assert_eq!(element.content(), &ElementContent::Text("Dear customer".into()));

        let err = element
            .set_content(ElementContent::Logo(Some(AssetRef::new("/logo.png"))))
            .unwrap_err();
        assert_eq!(err.expected, ElementKind::Text);
        assert_eq!(err.found, ElementKind::Logo);
        assert_eq!(element.kind(), ElementKind::Text);
        assert_eq!(element.id(), id);
    }

    #[test]
    fn test_row_for_y() {
        assert_eq!(row_for_y(0.0), 0);
        assert_eq!(row_for_y(80.0), 0);
        assert_eq!(row_for_y(150.0), 1);
        assert_eq!(row_for_y(449.9), 2);
        assert_eq!(row_for_y(-1.0), -1);
    }

    #[test]
    fn test_record_wire_shape() {
        let element = Element::new(ElementKind::Logo)
            .with_position(Point::new(10.0, 20.0))
            .with_row_order(3);
        let value = serde_json::to_value(element.to_record()).unwrap();

        assert_eq!(value["type"], "logo");
        assert_eq!(value["content"], "");
        assert_eq!(value["position"], json!({ "x": 10.0, "y": 20.0 }));
        assert_eq!(value["size"], json!({ "width": 200.0, "height": 150.0 }));
        assert_eq!(value["rowOrder"], 3);
    }

    #[test]
    fn test_record_defaults() {
        let record: ElementRecord = serde_json::from_value(json!({ "type": "text" })).unwrap();
        let element = Element::from_record(record).unwrap();

        assert_eq!(element.kind(), ElementKind::Text);
        assert_eq!(element.content(), &ElementContent::Text(String::new()));
        assert_eq!(element.position(), Point::ZERO);
        assert_eq!(element.size(), Size::new(200.0, 100.0));
        assert_eq!(element.row_order(), 0);
    }

    #[test]
    fn test_record_clamps_undersized() {
        let record: ElementRecord = serde_json::from_value(json!({
            "type": "table",
            "size": { "width": 20.0, "height": 20.0 }
        }))
        .unwrap();
        let element = Element::from_record(record).unwrap();
        assert_eq!(element.size(), Size::new(MIN_WIDTH, MIN_HEIGHT));
    }

    #[test]
    fn test_asset_content_decoding() {
        let logo = ElementContent::from_value(ElementKind::Logo, json!({ "url": "/a.png" })).unwrap();
        assert_eq!(logo.asset(), Some(&AssetRef::new("/a.png")));

        let empty = ElementContent::from_value(ElementKind::Image, json!("")).unwrap();
        assert_eq!(empty, ElementContent::Image(None));

        let err = ElementContent::from_value(ElementKind::Image, json!(42)).unwrap_err();
        assert_eq!(err.kind, ElementKind::Image);

        assert!(ElementContent::from_value(ElementKind::Text, json!({ "url": "x" })).is_err());
    }

    #[test]
    fn test_opaque_content_is_forwarded() {
        let payload = json!({ "rows": [["a", "b"], ["c", "d"]] });
        let table = ElementContent::from_value(ElementKind::Table, payload.clone()).unwrap();
        assert_eq!(table.to_value(), payload);
    }
}
