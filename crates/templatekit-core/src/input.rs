//! Input events delivered by the host canvas.

use crate::element::{ElementId, ElementKind};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Where a drop landed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropTarget {
    /// Pointer position in window coordinates.
    pub pointer: Point,
    /// Top-left corner of the drop zone in window coordinates.
    pub zone_origin: Point,
    /// Row supplied by the drop zone, if it has one.
    pub row: Option<i32>,
}

impl DropTarget {
    pub fn new(pointer: Point, zone_origin: Point) -> Self {
        Self {
            pointer,
            zone_origin,
            row: None,
        }
    }

    /// Drop onto a zone that carries an explicit row.
    pub fn with_row(mut self, row: i32) -> Self {
        self.row = Some(row);
        self
    }

    /// Drop point relative to the drop zone.
    pub fn canvas_point(&self) -> Point {
        (self.pointer - self.zone_origin).to_point()
    }
}

/// Pointer and drag events, in the order the host receives them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// A palette item started dragging.
    PaletteDragStart { kind: ElementKind },
    /// A placed element started dragging.
    ElementDragStart { id: ElementId },
    /// The drag entered the drop target of the element at `index`.
    DragEnter { index: usize },
    /// The drag was released over the canvas.
    Drop { target: DropTarget },
    /// The drag source reported the end of the drag.
    DragEnd,
    /// A resize handle was grabbed.
    ResizeStart { id: ElementId, pointer: Point },
    PointerMove { pointer: Point },
    PointerUp,
    /// Escape, or the pointer left the window.
    Cancel,
    WindowBlur,
}

impl InputEvent {
    /// Map a key name to an event, for keys that affect gestures.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Escape" => Some(InputEvent::Cancel),
            _ => None,
        }
    }
}

/// Gesture-scoped input capture.
///
/// Hosts that route pointer events through global listeners implement this
/// to register them when a gesture starts and remove them when it ends.
/// Every `acquire` is paired with exactly one `release`.
pub trait PointerCapture {
    fn acquire(&mut self);
    fn release(&mut self);
}

/// Capture for hosts that need no listener bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    fn acquire(&mut self) {}
    fn release(&mut self) {}
}
