//! Pure math/data for drawing in Strata
//!
//! This crate contains geometry primitives, color definitions and the
//! recorded paint operations produced by a paint pass.

mod color;
mod geometry;
mod paint;

pub use color::*;
pub use geometry::*;
pub use paint::*;

pub mod prelude {
    pub use crate::color::Color;
    pub use crate::geometry::{Point, Rect, Size};
    pub use crate::paint::{DisplayList, PaintOp};
}
