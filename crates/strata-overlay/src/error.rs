use std::fmt;

use crate::entry::EntryId;

/// Misuse of the overlay mutation API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayUsageError {
    /// `insert` was given both a `below` and an `above` anchor.
    BothBelowAndAbove,
    /// The entry is already attached to this overlay.
    AlreadyAttached(EntryId),
    /// The entry is attached to a different overlay.
    AttachedElsewhere(EntryId),
}

impl fmt::Display for OverlayUsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayUsageError::BothBelowAndAbove => {
                write!(f, "overlay insert accepts at most one of below and above")
            }
            OverlayUsageError::AlreadyAttached(id) => {
                write!(f, "overlay entry {id} is already attached to this overlay")
            }
            OverlayUsageError::AttachedElsewhere(id) => {
                write!(f, "overlay entry {id} is attached to another overlay")
            }
        }
    }
}

impl std::error::Error for OverlayUsageError {}
