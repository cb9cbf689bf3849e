//! Layout, paint and hit testing of an overlay and its entries.

use std::fmt;
use std::rc::Rc;

use strata_core::{HitTestResult, PaintContext, RenderBox, RenderSlot};
use strata_ui_graphics::{Point, Rect, Size};
use strata_ui_layout::Constraints;

use crate::entry::EntryId;

pub(crate) struct OverlayChild {
    pub(crate) id: EntryId,
    pub(crate) slot: Rc<RenderSlot>,
}

/// Render object of an [`OverlayStack`](crate::OverlayStack).
///
/// The page child sizes the overlay. Entries are laid out loosely within
/// that size at the origin, painted bottom to top and hit tested top to
/// bottom. From the lowest opaque entry upward, every entry emits an
/// occlusion region and the page child no longer receives hits.
pub struct RenderOverlay {
    child: Rc<RenderSlot>,
    entries: Vec<OverlayChild>,
    opaque_index: Option<usize>,
    size: Size,
}

impl RenderOverlay {
    pub(crate) fn new(child: Rc<RenderSlot>) -> Self {
        Self {
            child,
            entries: Vec::new(),
            opaque_index: None,
            size: Size::ZERO,
        }
    }

    pub(crate) fn set_children(&mut self, entries: Vec<OverlayChild>, opaque_index: Option<usize>) {
        self.entries = entries;
        self.opaque_index = opaque_index;
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.opaque_index = None;
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn opaque_index(&self) -> Option<usize> {
        self.opaque_index
    }

    /// Bounds of each entry from the last layout, bottom first.
    pub fn entry_bounds(&self) -> Vec<Rect> {
        self.entries.iter().map(|entry| entry.slot.bounds()).collect()
    }

    fn occludes(&self, index: usize) -> bool {
        self.opaque_index.is_some_and(|opaque| index >= opaque)
    }
}

impl RenderBox for RenderOverlay {
    fn layout(&mut self, constraints: Constraints) -> Size {
        let size = if self.child.has_content() {
            self.child.set_offset(Point::ZERO);
            self.child.layout(constraints)
        } else {
            constraints.constrain_size(constraints.biggest())
        };
        let entry_constraints = Constraints::loose_for(size);
        for entry in &self.entries {
            entry.slot.layout(entry_constraints);
            entry.slot.set_offset(Point::ZERO);
        }
        self.size = size;
        size
    }

    fn size(&self) -> Size {
        self.size
    }

    fn paint(&self, context: &mut PaintContext, offset: Point) {
        self.child.paint(context, offset);
        for (index, entry) in self.entries.iter().enumerate() {
            if self.occludes(index) {
                let bounds = entry.slot.bounds();
                context.occlude(bounds.translate(offset.x, offset.y));
            }
            entry.slot.paint(context, offset);
        }
    }

    fn hit_test(&self, position: Point, result: &mut HitTestResult) -> bool {
        if !Rect::from_size(self.size).contains_point(position) {
            return false;
        }
        for entry in self.entries.iter().rev() {
            if entry.slot.hit_test(position, result) {
                return true;
            }
        }
        if self.opaque_index.is_some() {
            return false;
        }
        self.child.hit_test(position, result)
    }
}

impl fmt::Debug for RenderOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOverlay")
            .field("entries", &self.entries.len())
            .field("opaque_index", &self.opaque_index)
            .field("size", &self.size)
            .finish()
    }
}
