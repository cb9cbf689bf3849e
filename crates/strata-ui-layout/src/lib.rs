//! Layout contracts for Strata

mod alignment;
mod constraints;

pub use alignment::*;
pub use constraints::*;

pub mod prelude {
    pub use crate::alignment::Alignment;
    pub use crate::constraints::Constraints;
}
