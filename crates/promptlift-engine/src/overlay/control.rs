//! The draggable action control.

use crate::page::{BoundingBox, Point};

use super::anchor::{AnchorCorner, AnchorSet};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragState {
    pub is_dragging: bool,
    /// Pointer position relative to the control's top-left corner.
    pub pointer_offset: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionControl {
    /// Top-left corner in viewport coordinates.
    pub position: Point,
    pub current_anchor: AnchorCorner,
    pub drag: DragState,
    pub size: f64,
}

impl ActionControl {
    pub fn new(anchor: AnchorCorner, size: f64) -> Self {
        Self {
            position: Point::default(),
            current_anchor: anchor,
            drag: DragState::default(),
            size,
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.position.x, self.position.y, self.size, self.size)
    }

    pub fn center(&self) -> Point {
        self.bbox().center()
    }

    /// Center the control on its current anchor. No-op while dragging.
    pub fn pin(&mut self, anchors: &AnchorSet) {
        if self.drag.is_dragging {
            return;
        }
        let point = anchors.get(self.current_anchor);
        self.position = Point::new(point.x - self.size / 2.0, point.y - self.size / 2.0);
    }

    /// Start dragging if the pointer is on the control.
    pub fn begin_drag(&mut self, pointer: Point) -> bool {
        if !self.bbox().contains(pointer) {
            return false;
        }
        self.drag = DragState {
            is_dragging: true,
            pointer_offset: Point::new(pointer.x - self.position.x, pointer.y - self.position.y),
        };
        true
    }

    /// Follow the pointer while dragging.
    pub fn drag_to(&mut self, pointer: Point) -> bool {
        if !self.drag.is_dragging {
            return false;
        }
        self.position = Point::new(
            pointer.x - self.drag.pointer_offset.x,
            pointer.y - self.drag.pointer_offset.y,
        );
        true
    }

    /// Drop the control on the anchor nearest to its center.
    pub fn end_drag(&mut self, pointer: Point, anchors: &AnchorSet) -> Option<AnchorCorner> {
        if !self.drag.is_dragging {
            return None;
        }
        self.drag_to(pointer);
        let corner = anchors.nearest(self.center());
        self.drag = DragState::default();
        self.current_anchor = corner;
        self.pin(anchors);
        Some(corner)
    }
}
