//! Leaf and single-child boxes used as overlay content.

use std::fmt;
use std::rc::Rc;

use strata_core::{Content, HitTestResult, PaintContext, RenderBox, TapHandler};
use strata_ui_graphics::{Color, Point, Rect, Size};
use strata_ui_layout::{Alignment, Constraints};

/// A box of a preferred size, optionally filled and optionally hittable.
///
/// The box only accepts hits when it has a label or a tap handler.
pub struct SizedBox {
    width: f32,
    height: f32,
    color: Option<Color>,
    label: Option<Rc<str>>,
    on_tap: Option<TapHandler>,
    size: Size,
}

impl SizedBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            color: None,
            label: None,
            on_tap: None,
            size: Size::ZERO,
        }
    }

    /// Takes all the space the constraints allow.
    pub fn expand() -> Self {
        Self::new(f32::INFINITY, f32::INFINITY)
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn label(mut self, label: impl Into<Rc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn on_tap(mut self, on_tap: impl Fn() + 'static) -> Self {
        self.on_tap = Some(Rc::new(on_tap));
        self
    }

    pub fn boxed(self) -> Content {
        Box::new(self)
    }
}

impl RenderBox for SizedBox {
    fn layout(&mut self, constraints: Constraints) -> Size {
        let (width, height) = constraints.constrain(self.width, self.height);
        self.size = Size::new(width, height);
        self.size
    }

    fn size(&self) -> Size {
        self.size
    }

    fn paint(&self, context: &mut PaintContext, offset: Point) {
        if let Some(color) = self.color {
            context.fill_rect(Rect::from_origin_size(offset, self.size), color);
        }
    }

    fn hit_test(&self, position: Point, result: &mut HitTestResult) -> bool {
        if self.label.is_none() && self.on_tap.is_none() {
            return false;
        }
        if !Rect::from_size(self.size).contains_point(position) {
            return false;
        }
        let label = self.label.clone().unwrap_or_else(|| Rc::from("SizedBox"));
        result.add(label, self.on_tap.clone());
        true
    }
}

impl fmt::Debug for SizedBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizedBox")
            .field("label", &self.label)
            .field("size", &self.size)
            .finish()
    }
}

/// Positions a child inside all the space it is given.
pub struct Align {
    alignment: Alignment,
    child: Content,
    child_offset: Point,
    size: Size,
}

impl Align {
    pub fn new(alignment: Alignment, child: Content) -> Self {
        Self {
            alignment,
            child,
            child_offset: Point::ZERO,
            size: Size::ZERO,
        }
    }

    /// Centers `child` inside all the space it is given.
    pub fn center(child: Content) -> Self {
        Self::new(Alignment::CENTER, child)
    }

    pub fn child_offset(&self) -> Point {
        self.child_offset
    }
}

impl RenderBox for Align {
    fn layout(&mut self, constraints: Constraints) -> Size {
        let child_size = self.child.layout(constraints.loosen());
        self.size = if constraints.is_bounded() {
            constraints.biggest()
        } else {
            constraints.constrain_size(child_size)
        };
        self.child_offset = self.alignment.align(self.size, child_size);
        self.size
    }

    fn size(&self) -> Size {
        self.size
    }

    fn paint(&self, context: &mut PaintContext, offset: Point) {
        self.child.paint(context, offset + self.child_offset);
    }

    fn hit_test(&self, position: Point, result: &mut HitTestResult) -> bool {
        if !Rect::from_size(self.size).contains_point(position) {
            return false;
        }
        self.child.hit_test(position - self.child_offset, result)
    }
}
