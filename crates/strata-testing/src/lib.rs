//! Testing utilities and harness for Strata

pub mod clock;
pub mod testing;

pub use clock::FakeClock;
pub use testing::*;

pub mod prelude {
    pub use crate::clock::FakeClock;
    pub use crate::testing::*;
    pub use strata_overlay::prelude::*;
}
