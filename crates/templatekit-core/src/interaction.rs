//! Gesture state machine.
//!
//! Translates palette drags, element drags, drag-over reordering and resize
//! handle drags into [`LayoutStore`] mutations. Only one gesture is active at a
//! time; every exit path (release, drop, drag end, cancel, blur) returns the
//! controller to [`GestureState::Idle`] and releases the pointer capture.
//!
//! Invariant violations (an unknown element, a duplicate id, a stale reorder
//! index) are logged and the offending mutation is dropped. They never
//! surface as errors to the host.

use crate::element::{Element, ElementId, ElementKind, clamp_size, row_for_y};
use crate::input::{DropTarget, InputEvent, NoCapture, PointerCapture};
use crate::layout::{ElementPatch, LayoutError, LayoutStore};
use kurbo::{Point, Size};

/// Starting point of a resize gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeAnchor {
    /// Pointer position when the handle was grabbed.
    pub start_pointer: Point,
    /// Element size when the handle was grabbed.
    pub start_size: Size,
}

impl ResizeAnchor {
    /// Clamped size for the given pointer position.
    pub fn size_at(&self, pointer: Point) -> Size {
        let delta = pointer - self.start_pointer;
        clamp_size(Size::new(
            self.start_size.width + delta.x,
            self.start_size.height + delta.y,
        ))
    }
}

/// The gesture currently in progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// A palette item is being dragged. No geometry exists yet.
    DraggingNew { kind: ElementKind },
    /// A placed element is being dragged.
    DraggingExisting {
        id: ElementId,
        /// Sequence index when the drag started.
        from_index: usize,
        /// Index of the last element the drag entered.
        target_index: Option<usize>,
    },
    /// A resize handle is being dragged.
    Resizing { id: ElementId, anchor: ResizeAnchor },
}

impl GestureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, GestureState::Idle)
    }

    fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "Idle",
            GestureState::DraggingNew { .. } => "DraggingNew",
            GestureState::DraggingExisting { .. } => "DraggingExisting",
            GestureState::Resizing { .. } => "Resizing",
        }
    }
}

/// What an event did to the layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nothing changed.
    None,
    Created(ElementId),
    Moved(ElementId),
    Reordered { id: ElementId, from: usize, to: usize },
    Resized { id: ElementId, size: Size },
    /// A gesture was abandoned without committing anything further.
    Cancelled,
}

/// Owns the gesture state and applies gestures to a layout.
#[derive(Debug)]
pub struct InteractionController<C: PointerCapture = NoCapture> {
    state: GestureState,
    capture: C,
    captured: bool,
}

impl Default for InteractionController<NoCapture> {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController<NoCapture> {
    /// Create a controller that does no capture bookkeeping.
    pub fn new() -> Self {
        Self::with_capture(NoCapture)
    }
}

impl<C: PointerCapture> InteractionController<C> {
    /// Create a controller that acquires `capture` for every gesture.
    pub fn with_capture(capture: C) -> Self {
        Self {
            state: GestureState::Idle,
            capture,
            captured: false,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    /// Dispatch a host event.
    pub fn handle(&mut self, store: &mut LayoutStore, event: InputEvent) -> Effect {
        match event {
            InputEvent::PaletteDragStart { kind } => {
                self.begin_palette_drag(kind);
                Effect::None
            }
            InputEvent::ElementDragStart { id } => {
                self.begin_element_drag(store, id);
                Effect::None
            }
            InputEvent::DragEnter { index } => {
                self.drag_enter(index);
                Effect::None
            }
            InputEvent::Drop { target } => self.drop_on(store, target),
            InputEvent::DragEnd => self.drag_end(store),
            InputEvent::ResizeStart { id, pointer } => {
                self.begin_resize(store, id, pointer);
                Effect::None
            }
            InputEvent::PointerMove { pointer } => self.pointer_move(store, pointer),
            InputEvent::PointerUp => self.pointer_up(),
            InputEvent::Cancel => self.cancel(),
            InputEvent::WindowBlur => self.window_blur(),
        }
    }

    /// Start dragging a new element of `kind` from the palette.
    pub fn begin_palette_drag(&mut self, kind: ElementKind) -> bool {
        if !self.ensure_idle("palette drag") {
            return false;
        }
        self.start(GestureState::DraggingNew { kind });
        true
    }

    /// Start dragging a placed element, remembering where it sits.
    pub fn begin_element_drag(&mut self, store: &LayoutStore, id: ElementId) -> bool {
        if !self.ensure_idle("element drag") {
            return false;
        }
        let Some(from_index) = store.index_of(id) else {
            log::warn!("Ignoring drag of unknown element {id}");
            return false;
        };
        self.start(GestureState::DraggingExisting {
            id,
            from_index,
            target_index: None,
        });
        true
    }

    /// Record the element the drag is currently over as reorder target.
    ///
    /// Entering the dragged element's own target leaves the sequence as it
    /// is when the drag ends.
    pub fn drag_enter(&mut self, index: usize) {
        if let GestureState::DraggingExisting { target_index, .. } = &mut self.state {
            *target_index = Some(index);
        }
    }

    /// Release a drag over the canvas.
    ///
    /// A palette drop creates an element and ends the gesture. An element
    /// drop moves the element in place; the gesture stays open until
    /// [`drag_end`](Self::drag_end) settles any pending reorder. Without a
    /// drag payload the drop is ignored.
    pub fn drop_on(&mut self, store: &mut LayoutStore, target: DropTarget) -> Effect {
        let point = target.canvas_point();
        let row = target.row.unwrap_or_else(|| row_for_y(point.y));

        match self.state.clone() {
            GestureState::DraggingNew { kind } => {
                self.finish();
                let element = Element::new(kind).with_position(point).with_row_order(row);
                let id = element.id();
                match store.add(element) {
                    Ok(()) => {
                        log::debug!("Created {kind} element {id} at ({}, {}) row {row}", point.x, point.y);
                        Effect::Created(id)
                    }
                    Err(e) => {
                        log::warn!("Dropped palette element: {e}");
                        Effect::None
                    }
                }
            }
            GestureState::DraggingExisting { id, .. } => {
                let patch = ElementPatch::new().position(point).row_order(row);
                match store.update_by_id(id, patch) {
                    Ok(()) => Effect::Moved(id),
                    Err(e) => {
                        log::debug!("Ignoring drop of removed element: {e}");
                        Effect::None
                    }
                }
            }
            GestureState::Idle | GestureState::Resizing { .. } => Effect::None,
        }
    }

    /// End a drag, committing the pending reorder if there is one.
    pub fn drag_end(&mut self, store: &mut LayoutStore) -> Effect {
        match self.state.clone() {
            GestureState::DraggingExisting {
                id,
                from_index,
                target_index,
            } => {
                self.finish();
                let Some(to) = target_index.filter(|&to| to != from_index) else {
                    return Effect::None;
                };
                if store.index_of(id) != Some(from_index) {
                    log::debug!("Dropping stale reorder of {id} from index {from_index}");
                    return Effect::None;
                }
                match store.move_to_index(from_index, to) {
                    Ok(()) => Effect::Reordered {
                        id,
                        from: from_index,
                        to,
                    },
                    Err(e) => {
                        log::warn!("Dropped reorder of {id}: {e}");
                        Effect::None
                    }
                }
            }
            GestureState::DraggingNew { .. } => {
                self.finish();
                Effect::None
            }
            GestureState::Idle | GestureState::Resizing { .. } => Effect::None,
        }
    }

    /// Grab the resize handle of an element.
    pub fn begin_resize(&mut self, store: &LayoutStore, id: ElementId, pointer: Point) -> bool {
        if !self.ensure_idle("resize") {
            return false;
        }
        let Some(element) = store.get(id) else {
            log::warn!("Ignoring resize of unknown element {id}");
            return false;
        };
        let anchor = ResizeAnchor {
            start_pointer: pointer,
            start_size: element.size(),
        };
        self.start(GestureState::Resizing { id, anchor });
        true
    }

    /// Track the pointer during a resize.
    pub fn pointer_move(&mut self, store: &mut LayoutStore, pointer: Point) -> Effect {
        let GestureState::Resizing { id, anchor } = self.state else {
            return Effect::None;
        };
        let size = anchor.size_at(pointer);
        match store.update_by_id(id, ElementPatch::new().size(size)) {
            Ok(()) => Effect::Resized { id, size },
            Err(LayoutError::NotFound(_)) => {
                log::debug!("Element {id} vanished mid-resize");
                self.finish();
                Effect::Cancelled
            }
            Err(e) => {
                log::warn!("Dropped resize of {id}: {e}");
                Effect::None
            }
        }
    }

    /// Release the pointer, ending a resize.
    pub fn pointer_up(&mut self) -> Effect {
        if matches!(self.state, GestureState::Resizing { .. }) {
            self.finish();
        }
        Effect::None
    }

    /// Abandon the current gesture. Mutations already applied stay.
    pub fn cancel(&mut self) -> Effect {
        if self.state.is_idle() {
            return Effect::None;
        }
        log::debug!("Cancelled {} gesture", self.state.name());
        self.finish();
        Effect::Cancelled
    }

    /// The window lost focus; a pointer-up may never arrive.
    pub fn window_blur(&mut self) -> Effect {
        self.cancel()
    }

    fn ensure_idle(&self, gesture: &str) -> bool {
        if self.state.is_idle() {
            return true;
        }
        log::debug!("Ignoring {gesture} start during {} gesture", self.state.name());
        false
    }

    fn start(&mut self, state: GestureState) {
        log::debug!("Gesture {} started", state.name());
        self.state = state;
        if !self.captured {
            self.capture.acquire();
            self.captured = true;
        }
    }

    fn finish(&mut self) {
        self.state = GestureState::Idle;
        if self.captured {
            self.capture.release();
            self.captured = false;
        }
    }
}

impl<C: PointerCapture> Drop for InteractionController<C> {
    fn drop(&mut self) {
        if self.captured {
            self.capture.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{MIN_HEIGHT, MIN_WIDTH};
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct CountingCapture {
        acquired: usize,
        released: usize,
    }

    impl PointerCapture for CountingCapture {
        fn acquire(&mut self) {
            self.acquired += 1;
        }

        fn release(&mut self) {
            self.released += 1;
        }
    }

    fn drop_at(x: f64, y: f64) -> DropTarget {
        DropTarget::new(Point::new(x, y), Point::ZERO)
    }

    fn layout_of(count: usize) -> (LayoutStore, Vec<ElementId>) {
        let mut store = LayoutStore::new();
        let ids = (0..count)
            .map(|_| {
                let element = Element::new(ElementKind::Text);
                let id = element.id();
                store.add(element).unwrap();
                id
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn test_palette_drop_creates_text_element() {
        let mut store = LayoutStore::new();
        let mut controller = InteractionController::new();

        assert!(controller.begin_palette_drag(ElementKind::Text));
        let target = DropTarget::new(Point::new(150.0, 280.0), Point::new(100.0, 200.0));
        let Effect::Created(id) = controller.drop_on(&mut store, target) else {
            panic!("expected a new element");
        };

        let element = store.get(id).unwrap();
        assert_eq!(element.kind(), ElementKind::Text);
        assert_eq!(element.position(), Point::new(50.0, 80.0));
        assert_eq!(element.size(), Size::new(200.0, 100.0));
        assert_eq!(element.row_order(), 0);
        assert!(controller.is_idle());
    }

    #[test]
    fn test_palette_drop_row_from_y_or_target() {
        let mut store = LayoutStore::new();
        let mut controller = InteractionController::new();

        controller.begin_palette_drag(ElementKind::Signature);
        let Effect::Created(derived) = controller.drop_on(&mut store, drop_at(10.0, 320.0)) else {
            panic!("expected a new element");
        };
        controller.begin_palette_drag(ElementKind::Table);
        let Effect::Created(explicit) = controller.drop_on(&mut store, drop_at(10.0, 320.0).with_row(0)) else {
            panic!("expected a new element");
        };

        assert_eq!(store.get(derived).unwrap().row_order(), 2);
        assert_eq!(store.get(explicit).unwrap().row_order(), 0);
        assert_eq!(store.get(derived).unwrap().size(), Size::new(200.0, 150.0));
    }

    #[test]
    fn test_drop_without_payload_is_ignored() {
        let (mut store, _) = layout_of(1);
        let before = store.revision();
        let mut controller = InteractionController::new();

        assert_eq!(controller.drop_on(&mut store, drop_at(10.0, 10.0)), Effect::None);
        assert_eq!(store.revision(), before);
        assert!(controller.is_idle());
    }

    #[test]
    fn test_move_keeps_sequence_index() {
        let (mut store, ids) = layout_of(3);
        let mut controller = InteractionController::new();

        controller.begin_element_drag(&store, ids[1]);
        assert_eq!(controller.drop_on(&mut store, drop_at(300.0, 460.0)), Effect::Moved(ids[1]));
        assert_eq!(controller.drag_end(&mut store), Effect::None);

        let moved = store.get(ids[1]).unwrap();
        assert_eq!(moved.position(), Point::new(300.0, 460.0));
        assert_eq!(moved.row_order(), 3);
        assert_eq!(store.index_of(ids[1]), Some(1));
        assert!(controller.is_idle());
    }

    #[test]
    fn test_reorder_on_drag_end() {
        let (mut store, ids) = layout_of(4);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        let mut controller = InteractionController::new();

        controller.begin_element_drag(&store, c);
        controller.drag_enter(1);
        controller.drag_enter(0);
        assert_eq!(
            controller.drag_end(&mut store),
            Effect::Reordered { id: c, from: 2, to: 0 }
        );

        let order: Vec<_> = store.iter().map(Element::id).collect();
        assert_eq!(order, vec![c, a, b, d]);
        assert!(controller.is_idle());
    }

    #[test]
    fn test_entering_own_target_is_not_a_reorder() {
        let (mut store, ids) = layout_of(3);
        let mut controller = InteractionController::new();
        let before = store.revision();

        controller.begin_element_drag(&store, ids[1]);
        controller.drag_enter(1);
        assert_eq!(controller.drag_end(&mut store), Effect::None);
        assert_eq!(store.revision(), before);

        // Coming back to its own target drops an earlier pending target.
        controller.begin_element_drag(&store, ids[1]);
        controller.drag_enter(0);
        controller.drag_enter(1);
        assert_eq!(controller.drag_end(&mut store), Effect::None);

        let order: Vec<_> = store.iter().map(Element::id).collect();
        assert_eq!(order, ids);
        assert_eq!(store.revision(), before);
        assert!(controller.is_idle());
    }

    #[test]
    fn test_move_and_reorder_in_one_gesture() {
        let (mut store, ids) = layout_of(3);
        let mut controller = InteractionController::new();

        controller.begin_element_drag(&store, ids[0]);
        controller.drag_enter(2);
        controller.drop_on(&mut store, drop_at(20.0, 30.0));
        controller.drag_end(&mut store);

        assert_eq!(store.index_of(ids[0]), Some(2));
        assert_eq!(store.get(ids[0]).unwrap().position(), Point::new(20.0, 30.0));
    }

    #[test]
    fn test_stale_reorder_is_dropped() {
        let (mut store, ids) = layout_of(3);
        let mut controller = InteractionController::new();

        controller.begin_element_drag(&store, ids[2]);
        controller.drag_enter(0);
        store.remove(ids[0]).unwrap();
        let before: Vec<_> = store.iter().map(Element::id).collect();

        assert_eq!(controller.drag_end(&mut store), Effect::None);
        let after: Vec<_> = store.iter().map(Element::id).collect();
        assert_eq!(before, after);
        assert!(controller.is_idle());
    }

    #[test]
    fn test_reorder_to_vanished_index_is_dropped() {
        let (mut store, ids) = layout_of(3);
        let mut controller = InteractionController::new();

        controller.begin_element_drag(&store, ids[0]);
        controller.drag_enter(2);
        store.remove(ids[2]).unwrap();

        assert_eq!(controller.drag_end(&mut store), Effect::None);
        assert_eq!(store.index_of(ids[0]), Some(0));
    }

    #[test]
    fn test_resize_clamps_width() {
        let (mut store, ids) = layout_of(1);
        let mut controller = InteractionController::new();

        controller.begin_resize(&store, ids[0], Point::new(400.0, 300.0));
        let effect = controller.pointer_move(&mut store, Point::new(250.0, 300.0));
        assert_eq!(
            effect,
            Effect::Resized {
                id: ids[0],
                size: Size::new(100.0, 100.0)
            }
        );
        controller.pointer_up();

        assert_eq!(store.get(ids[0]).unwrap().size(), Size::new(100.0, 100.0));
        assert!(controller.is_idle());
    }

    #[test]
    fn test_resize_is_relative_to_start() {
        let (mut store, ids) = layout_of(1);
        let mut controller = InteractionController::new();

        controller.begin_resize(&store, ids[0], Point::new(0.0, 0.0));
        controller.pointer_move(&mut store, Point::new(10.0, 10.0));
        controller.pointer_move(&mut store, Point::new(30.0, 20.0));
        controller.pointer_up();
        assert_eq!(store.get(ids[0]).unwrap().size(), Size::new(230.0, 120.0));

        // A fresh resize starts from the new size, not the old anchor.
        controller.begin_resize(&store, ids[0], Point::new(500.0, 500.0));
        controller.pointer_move(&mut store, Point::new(510.0, 500.0));
        assert_eq!(store.get(ids[0]).unwrap().size(), Size::new(240.0, 120.0));
    }

    #[test]
    fn test_moves_outside_resize_do_nothing() {
        let (mut store, _) = layout_of(1);
        let before = store.revision();
        let mut controller = InteractionController::new();

        assert_eq!(controller.pointer_move(&mut store, Point::new(10.0, 10.0)), Effect::None);
        assert_eq!(store.revision(), before);
    }

    #[test]
    fn test_resize_of_removed_element_cancels() {
        let (mut store, ids) = layout_of(1);
        let mut controller = InteractionController::new();

        controller.begin_resize(&store, ids[0], Point::ZERO);
        store.remove(ids[0]).unwrap();

        assert_eq!(controller.pointer_move(&mut store, Point::new(5.0, 5.0)), Effect::Cancelled);
        assert!(controller.is_idle());
        assert!(store.is_empty());
    }

    #[test]
    fn test_one_gesture_at_a_time() {
        let (store, ids) = layout_of(1);
        let mut controller = InteractionController::new();

        assert!(controller.begin_resize(&store, ids[0], Point::ZERO));
        assert!(!controller.begin_palette_drag(ElementKind::Logo));
        assert!(!controller.begin_element_drag(&store, ids[0]));
        assert!(matches!(controller.state(), GestureState::Resizing { .. }));
    }

    #[test]
    fn test_cancel_commits_nothing() {
        let (mut store, ids) = layout_of(2);
        let before = store.revision();
        let mut controller = InteractionController::new();

        controller.begin_element_drag(&store, ids[0]);
        controller.drag_enter(1);
        assert_eq!(controller.cancel(), Effect::Cancelled);
        assert_eq!(controller.drag_end(&mut store), Effect::None);

        controller.begin_palette_drag(ElementKind::Image);
        controller.window_blur();
        assert_eq!(controller.drop_on(&mut store, drop_at(1.0, 1.0)), Effect::None);

        assert_eq!(store.revision(), before);
        assert_eq!(store.index_of(ids[0]), Some(0));
    }

    #[test]
    fn test_unknown_element_gestures_stay_idle() {
        let store = LayoutStore::new();
        let mut controller = InteractionController::new();
        let ghost = uuid::Uuid::new_v4();

        assert!(!controller.begin_element_drag(&store, ghost));
        assert!(!controller.begin_resize(&store, ghost, Point::ZERO));
        assert!(controller.is_idle());
    }

    #[test]
    fn test_capture_released_on_every_exit() {
        let (mut store, ids) = layout_of(2);
        let mut controller = InteractionController::with_capture(CountingCapture::default());

        controller.begin_resize(&store, ids[0], Point::ZERO);
        controller.pointer_up();

        controller.begin_palette_drag(ElementKind::Text);
        controller.drop_on(&mut store, drop_at(0.0, 0.0));

        controller.begin_element_drag(&store, ids[1]);
        controller.drag_end(&mut store);

        controller.begin_resize(&store, ids[1], Point::ZERO);
        controller.window_blur();

        controller.begin_palette_drag(ElementKind::Logo);
        controller.handle(&mut store, InputEvent::Cancel);

        assert_eq!(controller.capture().acquired, 5);
        assert_eq!(controller.capture().released, 5);
    }

    #[test]
    fn test_handle_dispatches_events() {
        let mut store = LayoutStore::new();
        let mut controller = InteractionController::new();

        controller.handle(&mut store, InputEvent::PaletteDragStart { kind: ElementKind::Logo });
        let effect = controller.handle(
            &mut store,
            InputEvent::Drop {
                target: drop_at(5.0, 5.0),
            },
        );
        let Effect::Created(id) = effect else {
            panic!("expected a new element");
        };

        controller.handle(
            &mut store,
            InputEvent::ResizeStart {
                id,
                pointer: Point::ZERO,
            },
        );
        controller.handle(
            &mut store,
            InputEvent::PointerMove {
                pointer: Point::new(-500.0, -500.0),
            },
        );
        controller.handle(&mut store, InputEvent::PointerUp);

        assert_eq!(store.get(id).unwrap().size(), Size::new(MIN_WIDTH, MIN_HEIGHT));
        assert!(controller.is_idle());
    }

    proptest! {
        #[test]
        fn prop_resize_never_below_floor(
            start_w in 100.0f64..2000.0,
            start_h in 50.0f64..2000.0,
            dx in -5000.0f64..5000.0,
            dy in -5000.0f64..5000.0,
        ) {
            let element = Element::new(ElementKind::Image).with_size(Size::new(start_w, start_h));
            let id = element.id();
            let mut store = LayoutStore::new();
            store.add(element).unwrap();
            let mut controller = InteractionController::new();

            controller.begin_resize(&store, id, Point::ZERO);
            controller.pointer_move(&mut store, Point::new(dx, dy));

            let size = store.get(id).unwrap().size();
            prop_assert!(size.width >= MIN_WIDTH);
            prop_assert!(size.height >= MIN_HEIGHT);
        }
    }
}
