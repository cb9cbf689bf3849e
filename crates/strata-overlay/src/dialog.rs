//! Modal routes built from a barrier entry and a content entry.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use strata_core::{BuildContext, Content};
use strata_ui_graphics::Color;
use strata_ui_layout::Alignment;

use crate::barrier::ModalBarrier;
use crate::content::Align;
use crate::entry::{OverlayEntry, WeakOverlayEntry};
use crate::stack::OverlayStack;

pub type ModalBuilder = Rc<dyn Fn(&BuildContext, &DismissHandle) -> Content>;

#[derive(Default)]
struct DismissState {
    dismissed: Cell<bool>,
    entries: RefCell<Option<(WeakOverlayEntry, WeakOverlayEntry)>>,
}

/// Closes a dialog or bottom sheet.
///
/// Dismissing removes the barrier and content entries the first time and
/// does nothing afterwards. Handles only hold weak references to the
/// entries, so builders may capture them freely.
#[derive(Clone, Default)]
pub struct DismissHandle {
    state: Rc<DismissState>,
}

impl DismissHandle {
    /// A handle bound to nothing. Dismissing it only flips the flag.
    pub fn inert() -> Self {
        Self::default()
    }

    fn bind(&self, barrier: &OverlayEntry, content: &OverlayEntry) {
        *self.state.entries.borrow_mut() = Some((barrier.downgrade(), content.downgrade()));
    }

    pub fn dismiss(&self) {
        if self.state.dismissed.replace(true) {
            log::trace!("modal already dismissed");
            return;
        }
        let entries = self.state.entries.borrow_mut().take();
        if let Some((barrier, content)) = entries {
            if let Some(barrier) = barrier.upgrade() {
                barrier.remove();
            }
            if let Some(content) = content.upgrade() {
                content.remove();
            }
        }
    }

    pub fn is_dismissed(&self) -> bool {
        self.state.dismissed.get()
    }

    /// The barrier and content entries, while not dismissed and still alive.
    pub fn entries(&self) -> Option<(OverlayEntry, OverlayEntry)> {
        let entries = self.state.entries.borrow();
        let (barrier, content) = entries.as_ref()?;
        Some((barrier.upgrade()?, content.upgrade()?))
    }
}

impl fmt::Debug for DismissHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DismissHandle")
            .field("dismissed", &self.is_dismissed())
            .finish()
    }
}

/// Options for [`show_dialog`].
#[derive(Clone)]
pub struct DialogOptions {
    pub builder: ModalBuilder,
    /// A persistent dialog ignores taps on its barrier.
    pub persistent: bool,
    /// Transparent by default, in which case the barrier paints nothing.
    pub barrier_color: Color,
}

impl DialogOptions {
    pub fn new(builder: impl Fn(&BuildContext, &DismissHandle) -> Content + 'static) -> Self {
        Self {
            builder: Rc::new(builder),
            persistent: false,
            barrier_color: Color::TRANSPARENT,
        }
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn barrier_color(mut self, color: Color) -> Self {
        self.barrier_color = color;
        self
    }
}

/// Options for [`show_modal_bottom_sheet`].
#[derive(Clone)]
pub struct BottomSheetOptions {
    pub builder: ModalBuilder,
    pub persistent: bool,
    pub barrier_color: Color,
}

impl BottomSheetOptions {
    pub fn new(builder: impl Fn(&BuildContext, &DismissHandle) -> Content + 'static) -> Self {
        Self {
            builder: Rc::new(builder),
            persistent: false,
            barrier_color: Color::TRANSPARENT,
        }
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn barrier_color(mut self, color: Color) -> Self {
        self.barrier_color = color;
        self
    }
}

/// Shows a centered dialog above a modal barrier.
///
/// The content entry is opaque, so the page beneath stops receiving hits
/// while the barrier still gets them.
pub fn show_dialog(stack: &OverlayStack, options: DialogOptions) -> DismissHandle {
    show_modal(
        stack,
        Alignment::CENTER,
        options.builder,
        options.persistent,
        options.barrier_color,
    )
}

/// [`show_dialog`] on the overlay provided to `context`. Returns an inert
/// handle when there is none.
pub fn show_dialog_in(context: &BuildContext, options: DialogOptions) -> DismissHandle {
    match OverlayStack::of(context) {
        Some(stack) => show_dialog(&stack, options),
        None => {
            log::debug!("show_dialog_in: no overlay in context");
            DismissHandle::inert()
        }
    }
}

/// Shows content pinned to the bottom edge above a modal barrier.
pub fn show_modal_bottom_sheet(stack: &OverlayStack, options: BottomSheetOptions) -> DismissHandle {
    show_modal(
        stack,
        Alignment::BOTTOM_CENTER,
        options.builder,
        options.persistent,
        options.barrier_color,
    )
}

fn show_modal(
    stack: &OverlayStack,
    alignment: Alignment,
    builder: ModalBuilder,
    persistent: bool,
    barrier_color: Color,
) -> DismissHandle {
    let handle = DismissHandle::default();

    let barrier = {
        let handle = handle.clone();
        OverlayEntry::new(move |_| {
            let handle = handle.clone();
            Box::new(
                ModalBarrier::new(barrier_color)
                    .dismissible(!persistent)
                    .on_dismiss(move || handle.dismiss()),
            )
        })
    };
    let content = {
        let handle = handle.clone();
        OverlayEntry::new(move |context| {
            Box::new(Align::new(alignment, builder(context, &handle)))
        })
        .with_opaque(true)
    };

    handle.bind(&barrier, &content);
    stack.insert_all(&[barrier, content], None, None);
    handle
}
