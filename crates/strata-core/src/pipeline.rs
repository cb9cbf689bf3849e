//! Layout and paint flushing for the root render box.

use std::cell::RefCell;
use std::rc::Rc;

use strata_ui_graphics::{DisplayList, Point, Size};
use strata_ui_layout::Constraints;

use crate::render::{HitTestResult, PaintContext, RenderBox};

/// Drives layout and paint of a single root box against a fixed surface.
pub struct PipelineOwner {
    root: Option<Rc<RefCell<dyn RenderBox>>>,
    surface_size: Size,
    needs_layout: bool,
    needs_paint: bool,
    last_frame: DisplayList,
}

impl PipelineOwner {
    pub fn new(surface_size: Size) -> Self {
        Self {
            root: None,
            surface_size,
            needs_layout: true,
            needs_paint: true,
            last_frame: DisplayList::new(),
        }
    }

    pub fn set_root(&mut self, root: Rc<RefCell<dyn RenderBox>>) {
        self.root = Some(root);
        self.mark_needs_layout();
    }

    pub fn clear_root(&mut self) {
        self.root = None;
        self.mark_needs_layout();
    }

    pub fn has_root(&self) -> bool {
        self.root.is_some()
    }

    pub fn surface_size(&self) -> Size {
        self.surface_size
    }

    pub fn set_surface_size(&mut self, size: Size) {
        if self.surface_size != size {
            self.surface_size = size;
            self.mark_needs_layout();
        }
    }

    pub fn mark_needs_layout(&mut self) {
        self.needs_layout = true;
        self.needs_paint = true;
    }

    pub fn mark_needs_paint(&mut self) {
        self.needs_paint = true;
    }

    pub fn needs_layout(&self) -> bool {
        self.needs_layout
    }

    pub fn needs_paint(&self) -> bool {
        self.needs_paint
    }

    /// Lays the root out with tight constraints matching the surface.
    /// Returns whether layout ran.
    pub fn flush_layout(&mut self) -> bool {
        if !self.needs_layout {
            return false;
        }
        self.needs_layout = false;
        if let Some(root) = &self.root {
            let constraints = Constraints::tight_for(self.surface_size);
            root.borrow_mut().layout(constraints);
        }
        self.needs_paint = true;
        true
    }

    /// Paints the root into a fresh display list. Returns whether paint ran.
    pub fn flush_paint(&mut self) -> bool {
        if !self.needs_paint {
            return false;
        }
        self.needs_paint = false;
        let mut context = PaintContext::new();
        if let Some(root) = &self.root {
            root.borrow().paint(&mut context, Point::ZERO);
        }
        self.last_frame = context.finish();
        true
    }

    pub fn last_frame(&self) -> &DisplayList {
        &self.last_frame
    }

    /// Hit tests the root. Returns the collected path when the root absorbed
    /// the position.
    pub fn hit_test(&self, position: Point) -> Option<HitTestResult> {
        let root = self.root.as_ref()?;
        let mut result = HitTestResult::new();
        if root.borrow().hit_test(position, &mut result) {
            Some(result)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for PipelineOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOwner")
            .field("has_root", &self.root.is_some())
            .field("surface_size", &self.surface_size)
            .field("needs_layout", &self.needs_layout)
            .field("needs_paint", &self.needs_paint)
            .finish()
    }
}
