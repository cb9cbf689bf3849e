//! Recorded paint operations

use crate::{Color, Rect};

/// A paint operation emitted by a render box during the paint pass.
#[derive(Clone, Debug, PartialEq)]
pub enum PaintOp {
    /// Solid fill of a rectangle in surface coordinates.
    FillRect { rect: Rect, color: Color },
    /// Marks a region where natively composited content beneath must be
    /// hidden or clipped.
    Occlude { rect: Rect },
}

/// Operations recorded for one painted frame, in submission order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayList {
    operations: Vec<PaintOp>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: PaintOp) {
        self.operations.push(op);
    }

    /// Returns a slice of recorded operations in submission order.
    pub fn operations(&self) -> &[PaintOp] {
        &self.operations
    }

    /// Consumes the list and yields the owned operations.
    pub fn into_operations(self) -> Vec<PaintOp> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Returns an iterator over occlusion regions.
    pub fn occlusions(&self) -> impl Iterator<Item = &Rect> {
        self.operations.iter().filter_map(|op| match op {
            PaintOp::Occlude { rect } => Some(rect),
            _ => None,
        })
    }

    /// Returns an iterator over filled rectangles and their colors.
    pub fn fills(&self) -> impl Iterator<Item = (&Rect, &Color)> {
        self.operations.iter().filter_map(|op| match op {
            PaintOp::FillRect { rect, color } => Some((rect, color)),
            _ => None,
        })
    }
}
