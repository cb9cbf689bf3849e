//! Overlay entries: one layer of overlaid content each.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use strata_core::{BuildContext, Content, ElementHandle};

use crate::stack::{OverlayStack, StackId, StackInner};

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique entry identity. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    fn next() -> Self {
        Self(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type EntryBuilder = Rc<dyn Fn(&BuildContext) -> Content>;

/// Which overlay an entry belongs to.
#[derive(Clone)]
pub(crate) struct StackLink {
    pub(crate) id: StackId,
    pub(crate) stack: Weak<StackInner>,
}

pub(crate) struct EntryInner {
    id: EntryId,
    builder: EntryBuilder,
    opaque: Cell<bool>,
    maintain_state: Cell<bool>,
    link: RefCell<Option<StackLink>>,
    mount: RefCell<Option<ElementHandle>>,
}

/// A layer of content placed in an [`OverlayStack`].
///
/// Cloning yields another handle to the same entry. An entry lives in at
/// most one overlay at a time; its builder runs on every build pass of that
/// overlay.
#[derive(Clone)]
pub struct OverlayEntry {
    inner: Rc<EntryInner>,
}

impl OverlayEntry {
    pub fn new(builder: impl Fn(&BuildContext) -> Content + 'static) -> Self {
        Self::from_builder(Rc::new(builder))
    }

    pub fn from_builder(builder: EntryBuilder) -> Self {
        Self {
            inner: Rc::new(EntryInner {
                id: EntryId::next(),
                builder,
                opaque: Cell::new(false),
                maintain_state: Cell::new(false),
                link: RefCell::new(None),
                mount: RefCell::new(None),
            }),
        }
    }

    pub fn with_opaque(self, opaque: bool) -> Self {
        self.inner.opaque.set(opaque);
        self
    }

    pub fn with_maintain_state(self, maintain_state: bool) -> Self {
        self.inner.maintain_state.set(maintain_state);
        self
    }

    pub fn id(&self) -> EntryId {
        self.inner.id
    }

    pub fn is_opaque(&self) -> bool {
        self.inner.opaque.get()
    }

    /// Opaque entries keep hits from reaching the page beneath the overlay
    /// and emit occlusion regions. Changing the flag rebuilds the owning
    /// overlay.
    pub fn set_opaque(&self, opaque: bool) {
        if self.inner.opaque.replace(opaque) != opaque {
            if let Some(stack) = self.stack() {
                stack.mark_needs_build();
            }
        }
    }

    /// Stored for API compatibility; every entry is built regardless.
    pub fn maintains_state(&self) -> bool {
        self.inner.maintain_state.get()
    }

    pub fn set_maintain_state(&self, maintain_state: bool) {
        self.inner.maintain_state.set(maintain_state);
    }

    /// Whether the entry currently belongs to an overlay.
    pub fn is_attached(&self) -> bool {
        self.inner.link.borrow().is_some()
    }

    /// Whether the entry's content has been built by its overlay.
    pub fn is_mounted(&self) -> bool {
        self.inner.mount.borrow().is_some()
    }

    /// The overlay this entry belongs to, if it is still alive.
    pub fn stack(&self) -> Option<OverlayStack> {
        self.inner
            .link
            .borrow()
            .as_ref()
            .and_then(|link| link.stack.upgrade())
            .map(OverlayStack::from_inner)
    }

    /// Detaches the entry from its overlay. Safe to call any number of
    /// times; calls on an unattached entry do nothing.
    pub fn remove(&self) {
        let link = self.inner.link.borrow().clone();
        let Some(link) = link else {
            log::trace!("remove on unattached overlay entry {}", self.id());
            return;
        };
        match link.stack.upgrade() {
            Some(stack) => OverlayStack::from_inner(stack).remove_entry(self),
            None => {
                // The overlay is gone; nothing left to scrub.
                self.clear_link_if(link.id);
            }
        }
    }

    /// Rebuilds this entry's content on the next frame. No-op unless
    /// mounted.
    pub fn mark_needs_build(&self) {
        let mount = self.inner.mount.borrow().clone();
        match mount {
            Some(handle) => handle.mark_needs_build(),
            None => log::trace!("mark_needs_build on unmounted overlay entry {}", self.id()),
        }
    }

    pub fn ptr_eq(&self, other: &OverlayEntry) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakOverlayEntry {
        WeakOverlayEntry {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub(crate) fn builder(&self) -> EntryBuilder {
        Rc::clone(&self.inner.builder)
    }

    pub(crate) fn linked_stack_id(&self) -> Option<StackId> {
        self.inner.link.borrow().as_ref().map(|link| link.id)
    }

    /// Linked to `id`, or linked to an overlay that no longer exists.
    pub(crate) fn link_state(&self, id: StackId) -> LinkState {
        match self.inner.link.borrow().as_ref() {
            None => LinkState::Unlinked,
            Some(link) if link.id == id => LinkState::Here,
            Some(link) if link.stack.strong_count() == 0 => LinkState::Unlinked,
            Some(_) => LinkState::Elsewhere,
        }
    }

    pub(crate) fn is_linked_to(&self, id: StackId) -> bool {
        self.linked_stack_id() == Some(id)
    }

    pub(crate) fn set_link(&self, link: StackLink) {
        *self.inner.link.borrow_mut() = Some(link);
    }

    /// Clears the overlay and mount references if the entry still belongs
    /// to overlay `id`. Returns whether anything was cleared.
    pub(crate) fn clear_link_if(&self, id: StackId) -> bool {
        let mut link = self.inner.link.borrow_mut();
        if link.as_ref().map(|link| link.id) != Some(id) {
            return false;
        }
        link.take();
        drop(link);
        self.inner.mount.borrow_mut().take();
        true
    }

    pub(crate) fn mount_handle(&self) -> Option<ElementHandle> {
        self.inner.mount.borrow().clone()
    }

    pub(crate) fn set_mount(&self, handle: ElementHandle) {
        *self.inner.mount.borrow_mut() = Some(handle);
    }

    /// Clears the mount reference only if it still points at `handle`.
    pub(crate) fn clear_mount_if(&self, handle: &ElementHandle) {
        let mut mount = self.inner.mount.borrow_mut();
        if mount.as_ref().map(ElementHandle::id) == Some(handle.id()) {
            mount.take();
        }
    }
}

impl PartialEq for OverlayEntry {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for OverlayEntry {}

impl fmt::Debug for OverlayEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayEntry")
            .field("id", &self.inner.id)
            .field("opaque", &self.inner.opaque.get())
            .field("attached", &self.is_attached())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

/// Non-owning handle to an [`OverlayEntry`].
#[derive(Clone, Debug)]
pub struct WeakOverlayEntry {
    inner: Weak<EntryInner>,
}

impl WeakOverlayEntry {
    pub fn upgrade(&self) -> Option<OverlayEntry> {
        self.inner.upgrade().map(|inner| OverlayEntry { inner })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LinkState {
    Unlinked,
    Here,
    Elsewhere,
}
