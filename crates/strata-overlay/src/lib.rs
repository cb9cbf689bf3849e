//! Overlay stack for Strata.
//!
//! An [`OverlayStack`] layers [`OverlayEntry`] content above a page child.
//! Entries are built by the stack's build pass, which the frame scheduler
//! runs when the stack is dirty; insertions and removals requested while the
//! stack is building are queued and applied right after it.
//!
//! Modal routes ([`show_dialog`], [`show_modal_bottom_sheet`]) combine a
//! [`ModalBarrier`] entry with an opaque content entry and hand back a
//! [`DismissHandle`].

mod barrier;
mod content;
mod dialog;
mod entry;
mod error;
mod render_overlay;
mod stack;

pub use barrier::{ModalBarrier, MODAL_BARRIER_LABEL};
pub use content::{Align, SizedBox};
pub use dialog::{
    show_dialog, show_dialog_in, show_modal_bottom_sheet, BottomSheetOptions, DialogOptions,
    DismissHandle, ModalBuilder,
};
pub use entry::{EntryBuilder, EntryId, OverlayEntry, WeakOverlayEntry};
pub use error::OverlayUsageError;
pub use render_overlay::RenderOverlay;
pub use stack::{ChildBuilder, OverlayConfig, OverlayStack, ReadyCallback, StackId};

pub mod prelude {
    pub use crate::content::{Align, SizedBox};
    pub use crate::dialog::{show_dialog, DialogOptions, DismissHandle};
    pub use crate::entry::OverlayEntry;
    pub use crate::stack::{OverlayConfig, OverlayStack};
}
