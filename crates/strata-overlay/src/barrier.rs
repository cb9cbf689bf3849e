use std::fmt;
use std::rc::Rc;

use strata_core::{HitTestResult, PaintContext, RenderBox, TapHandler};
use strata_ui_graphics::{Color, Point, Rect, Size};
use strata_ui_layout::Constraints;

pub const MODAL_BARRIER_LABEL: &str = "ModalBarrier";

/// Full-size layer that swallows every hit inside its bounds.
///
/// A dismissible barrier runs its dismiss callback when tapped; a
/// persistent one absorbs the tap and does nothing.
pub struct ModalBarrier {
    color: Color,
    dismissible: bool,
    on_dismiss: Option<TapHandler>,
    semantic_label: Rc<str>,
    size: Size,
}

impl ModalBarrier {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            dismissible: true,
            on_dismiss: None,
            semantic_label: Rc::from(MODAL_BARRIER_LABEL),
            size: Size::ZERO,
        }
    }

    pub fn dismissible(mut self, dismissible: bool) -> Self {
        self.dismissible = dismissible;
        self
    }

    pub fn on_dismiss(mut self, on_dismiss: impl Fn() + 'static) -> Self {
        self.on_dismiss = Some(Rc::new(on_dismiss));
        self
    }

    pub fn semantic_label(mut self, label: impl Into<Rc<str>>) -> Self {
        self.semantic_label = label.into();
        self
    }

    pub fn is_dismissible(&self) -> bool {
        self.dismissible
    }
}

impl RenderBox for ModalBarrier {
    fn layout(&mut self, constraints: Constraints) -> Size {
        self.size = constraints.biggest();
        self.size
    }

    fn size(&self) -> Size {
        self.size
    }

    fn paint(&self, context: &mut PaintContext, offset: Point) {
        if !self.color.is_transparent() {
            context.fill_rect(Rect::from_origin_size(offset, self.size), self.color);
        }
    }

    fn hit_test(&self, position: Point, result: &mut HitTestResult) -> bool {
        if !Rect::from_size(self.size).contains_point(position) {
            return false;
        }
        let on_tap = if self.dismissible {
            self.on_dismiss.clone()
        } else {
            None
        };
        result.add(Rc::clone(&self.semantic_label), on_tap);
        true
    }
}

impl fmt::Debug for ModalBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalBarrier")
            .field("color", &self.color)
            .field("dismissible", &self.dismissible)
            .field("semantic_label", &self.semantic_label)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/barrier_tests.rs"]
mod tests;
