//! Render contracts: box layout, paint recording and hit testing.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use strata_ui_graphics::{Color, DisplayList, PaintOp, Point, Rect, Size};
use strata_ui_layout::Constraints;

/// A laid-out box that paints itself and answers hit tests.
///
/// Positions handed to [`RenderBox::hit_test`] are local to the box.
pub trait RenderBox {
    fn layout(&mut self, constraints: Constraints) -> Size;

    /// Size computed by the last layout.
    fn size(&self) -> Size;

    fn paint(&self, context: &mut PaintContext, offset: Point);

    /// Records hit targets into `result` and returns whether the position
    /// was absorbed.
    fn hit_test(&self, position: Point, result: &mut HitTestResult) -> bool;
}

/// Boxed content produced by a builder.
pub type Content = Box<dyn RenderBox>;

/// Shared holder for a piece of content and its last layout.
///
/// Builders replace the content; the render tree lays it out and paints it.
#[derive(Default)]
pub struct RenderSlot {
    content: RefCell<Option<Content>>,
    offset: Cell<Point>,
    size: Cell<Size>,
}

impl RenderSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_content(&self, content: Content) {
        *self.content.borrow_mut() = Some(content);
    }

    pub fn clear(&self) {
        self.content.borrow_mut().take();
        self.size.set(Size::ZERO);
    }

    pub fn has_content(&self) -> bool {
        self.content.borrow().is_some()
    }

    pub fn offset(&self) -> Point {
        self.offset.get()
    }

    pub fn set_offset(&self, offset: Point) {
        self.offset.set(offset);
    }

    pub fn size(&self) -> Size {
        self.size.get()
    }

    /// Bounds in the parent's coordinate space.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.offset.get(), self.size.get())
    }

    /// Lays out the content. An empty slot takes the smallest size allowed.
    pub fn layout(&self, constraints: Constraints) -> Size {
        let size = match self.content.borrow_mut().as_mut() {
            Some(content) => content.layout(constraints),
            None => constraints.smallest(),
        };
        self.size.set(size);
        size
    }

    /// Paints the content at the slot offset relative to `origin`.
    pub fn paint(&self, context: &mut PaintContext, origin: Point) {
        if let Some(content) = self.content.borrow().as_ref() {
            content.paint(context, origin + self.offset.get());
        }
    }

    /// Hit tests `position`, given in the parent's coordinate space.
    pub fn hit_test(&self, position: Point, result: &mut HitTestResult) -> bool {
        match self.content.borrow().as_ref() {
            Some(content) => content.hit_test(position - self.offset.get(), result),
            None => false,
        }
    }
}

impl fmt::Debug for RenderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSlot")
            .field("has_content", &self.has_content())
            .field("offset", &self.offset.get())
            .field("size", &self.size.get())
            .finish()
    }
}

/// Callback attached to a hit target.
pub type TapHandler = Rc<dyn Fn()>;

/// A single target recorded during hit testing.
#[derive(Clone)]
pub struct HitTestEntry {
    pub label: Rc<str>,
    pub on_tap: Option<TapHandler>,
}

impl fmt::Debug for HitTestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitTestEntry")
            .field("label", &self.label)
            .field("tappable", &self.on_tap.is_some())
            .finish()
    }
}

/// Result of a hit test, innermost target first.
#[derive(Clone, Debug, Default)]
pub struct HitTestResult {
    entries: SmallVec<[HitTestEntry; 4]>,
}

impl HitTestResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: Rc<str>, on_tap: Option<TapHandler>) {
        self.entries.push(HitTestEntry { label, on_tap });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HitTestEntry> {
        self.entries.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| &*entry.label).collect()
    }

    /// Invokes the first tap handler along the path. Returns whether one ran.
    pub fn dispatch_tap(&self) -> bool {
        let handler = self
            .entries
            .iter()
            .find_map(|entry| entry.on_tap.as_ref())
            .cloned();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

/// Records paint operations for one frame.
#[derive(Debug, Default)]
pub struct PaintContext {
    list: DisplayList,
}

impl PaintContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.list.push(PaintOp::FillRect { rect, color });
    }

    /// Emits an occlusion region for natively composited content.
    pub fn occlude(&mut self, rect: Rect) {
        self.list.push(PaintOp::Occlude { rect });
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.list
    }

    pub fn finish(self) -> DisplayList {
        self.list
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
