use strata_ui_graphics::{Point, Size};

/// Where a child sits inside a larger box.
///
/// Each axis is a bias from -1.0 (start/top) through 0.0 (center) to 1.0
/// (end/bottom). A child larger than the box is pinned to the start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alignment {
    pub x: f32,
    pub y: f32,
}

impl Alignment {
    pub const CENTER: Self = Self::new(0.0, 0.0);

    pub const BOTTOM_CENTER: Self = Self::new(0.0, 1.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn align(&self, available: Size, child: Size) -> Point {
        Point::new(
            bias_offset(self.x, available.width - child.width),
            bias_offset(self.y, available.height - child.height),
        )
    }
}

fn bias_offset(bias: f32, slack: f32) -> f32 {
    if slack <= 0.0 {
        return 0.0;
    }
    slack * (bias.clamp(-1.0, 1.0) + 1.0) / 2.0
}

#[cfg(test)]
#[path = "tests/alignment_tests.rs"]
mod tests;
