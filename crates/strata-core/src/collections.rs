//! Hash map used for the element registry and inherited values.
//! `std-hash` swaps the Fx hasher for std's SipHash.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use rustc_hash::FxHashMap as HashMap;
}
