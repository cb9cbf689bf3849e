//! The overlay container and its mutation queue.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use strata_core::{
    BuildContext, BuildOwner, Content, Element, ElementHandle, RenderBox, RenderSlot,
};

use crate::entry::{EntryId, LinkState, OverlayEntry, StackLink, WeakOverlayEntry};
use crate::error::OverlayUsageError;
use crate::render_overlay::{OverlayChild, RenderOverlay};

static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique overlay identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(u64);

impl StackId {
    fn next() -> Self {
        Self(NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

pub type ChildBuilder = Rc<dyn Fn(&BuildContext) -> Content>;
pub type ReadyCallback = Box<dyn FnOnce(&OverlayStack)>;

/// Construction options for an [`OverlayStack`].
#[derive(Default)]
pub struct OverlayConfig {
    /// Page content painted beneath every entry.
    pub child: Option<ChildBuilder>,
    /// Entries attached at construction, bottom first.
    pub initial_entries: Vec<OverlayEntry>,
    /// Runs once, on the frame after the first build pass.
    pub on_ready: Option<ReadyCallback>,
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_child(mut self, child: impl Fn(&BuildContext) -> Content + 'static) -> Self {
        self.child = Some(Rc::new(child));
        self
    }

    pub fn with_initial_entries(mut self, entries: Vec<OverlayEntry>) -> Self {
        self.initial_entries = entries;
        self
    }

    pub fn with_on_ready(mut self, on_ready: impl FnOnce(&OverlayStack) + 'static) -> Self {
        self.on_ready = Some(Box::new(on_ready));
        self
    }
}

impl fmt::Debug for OverlayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayConfig")
            .field("has_child", &self.child.is_some())
            .field("initial_entries", &self.initial_entries)
            .field("has_on_ready", &self.on_ready.is_some())
            .finish()
    }
}

/// Mutation requested while the overlay was building.
enum PendingOp {
    Insert {
        entry: OverlayEntry,
        below: Option<OverlayEntry>,
        above: Option<OverlayEntry>,
    },
    Remove {
        entry: OverlayEntry,
    },
    Rearrange {
        entries: Vec<OverlayEntry>,
    },
}

#[derive(Default)]
struct StackState {
    entries: Vec<OverlayEntry>,
    building: bool,
    pending: Vec<PendingOp>,
    mounted: IndexMap<EntryId, Rc<EntryElement>>,
    opaque_index: Option<usize>,
    disposed: bool,
}

impl StackState {
    fn position(&self, entry: &OverlayEntry) -> Option<usize> {
        self.entries.iter().position(|e| e.ptr_eq(entry))
    }
}

/// Value provided to builders so they can find their overlay.
struct OverlayScope {
    stack: Weak<StackInner>,
}

pub(crate) struct StackInner {
    id: StackId,
    self_weak: Weak<StackInner>,
    owner: BuildOwner,
    element: RefCell<Option<ElementHandle>>,
    state: RefCell<StackState>,
    render: Rc<RefCell<RenderOverlay>>,
    child_slot: Rc<RenderSlot>,
    child: Option<ChildBuilder>,
    on_ready: RefCell<Option<ReadyCallback>>,
    builds: Cell<u64>,
}

/// An ordered stack of [`OverlayEntry`] layers above page content.
///
/// Index 0 is the bottom layer. The order is paint order and the reverse of
/// hit-test order. Mutations made while the stack is building are queued
/// and applied right after the build pass.
#[derive(Clone)]
pub struct OverlayStack {
    inner: Rc<StackInner>,
}

impl OverlayStack {
    pub fn new(owner: &BuildOwner, config: OverlayConfig) -> Self {
        let OverlayConfig {
            child,
            initial_entries,
            on_ready,
        } = config;
        let child_slot = Rc::new(RenderSlot::new());
        let inner = Rc::new_cyclic(|weak| StackInner {
            id: StackId::next(),
            self_weak: weak.clone(),
            owner: owner.clone(),
            element: RefCell::new(None),
            state: RefCell::new(StackState::default()),
            render: Rc::new(RefCell::new(RenderOverlay::new(Rc::clone(&child_slot)))),
            child_slot,
            child,
            on_ready: RefCell::new(on_ready),
            builds: Cell::new(0),
        });
        let element: Weak<dyn Element> = Rc::downgrade(&inner) as Weak<dyn Element>;
        let handle = owner.register(element);
        handle.mark_needs_build();
        *inner.element.borrow_mut() = Some(handle);

        let stack = Self { inner };
        stack.insert_all(&initial_entries, None, None);
        log::debug!(
            "created overlay {:?} with {} initial entries",
            stack.inner.id,
            initial_entries.len()
        );
        stack
    }

    pub(crate) fn from_inner(inner: Rc<StackInner>) -> Self {
        Self { inner }
    }

    /// The overlay provided to `context`, if any.
    pub fn of(context: &BuildContext) -> Option<OverlayStack> {
        context
            .inherited::<OverlayScope>()
            .and_then(|scope| scope.stack.upgrade())
            .map(Self::from_inner)
    }

    pub fn id(&self) -> StackId {
        self.inner.id
    }

    /// Inserts `entry` into the stack.
    ///
    /// `below` places it immediately under that entry (bottom if not found);
    /// `above` immediately over it (top if not found); neither places it on
    /// top.
    ///
    /// A disposed stack ignores the call and leaves `entry` unattached.
    ///
    /// # Panics
    ///
    /// Panics with an [`OverlayUsageError`] if both anchors are given or the
    /// entry is already attached to an overlay.
    pub fn insert(
        &self,
        entry: &OverlayEntry,
        below: Option<&OverlayEntry>,
        above: Option<&OverlayEntry>,
    ) {
        if let Err(error) = self.try_insert(entry, below, above) {
            panic!("{error}");
        }
    }

    /// Fallible form of [`OverlayStack::insert`].
    pub fn try_insert(
        &self,
        entry: &OverlayEntry,
        below: Option<&OverlayEntry>,
        above: Option<&OverlayEntry>,
    ) -> Result<(), OverlayUsageError> {
        if below.is_some() && above.is_some() {
            return Err(OverlayUsageError::BothBelowAndAbove);
        }
        self.inner.check_unlinked(entry)?;
        self.inner.insert(entry, below, above);
        Ok(())
    }

    /// Inserts each of `entries` in order with the same anchor.
    ///
    /// Without an anchor each entry goes directly above the previous one,
    /// so the input order becomes the stacking order, first one lowest. With
    /// `above` every entry lands directly over the anchor, which leaves the
    /// last one lowest.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`OverlayStack::insert`]. Nothing
    /// is inserted in that case.
    pub fn insert_all(
        &self,
        entries: &[OverlayEntry],
        below: Option<&OverlayEntry>,
        above: Option<&OverlayEntry>,
    ) {
        if let Err(error) = self.try_insert_all(entries, below, above) {
            panic!("{error}");
        }
    }

    pub fn try_insert_all(
        &self,
        entries: &[OverlayEntry],
        below: Option<&OverlayEntry>,
        above: Option<&OverlayEntry>,
    ) -> Result<(), OverlayUsageError> {
        if below.is_some() && above.is_some() {
            return Err(OverlayUsageError::BothBelowAndAbove);
        }
        for (index, entry) in entries.iter().enumerate() {
            self.inner.check_unlinked(entry)?;
            if entries[..index].iter().any(|e| e.ptr_eq(entry)) {
                return Err(OverlayUsageError::AlreadyAttached(entry.id()));
            }
        }
        if below.is_some() || above.is_some() {
            for entry in entries {
                self.inner.insert(entry, below, above);
            }
            return Ok(());
        }
        let mut previous: Option<&OverlayEntry> = None;
        for entry in entries {
            self.inner.insert(entry, None, previous);
            previous = Some(entry);
        }
        Ok(())
    }

    /// Replaces the stack's order with `new_order`.
    ///
    /// Attached entries missing from `new_order` are detached without an
    /// explicit remove. Duplicates keep their first position.
    ///
    /// # Panics
    ///
    /// Panics if an entry of `new_order` belongs to another overlay.
    pub fn rearrange(&self, new_order: &[OverlayEntry]) {
        if let Err(error) = self.try_rearrange(new_order) {
            panic!("{error}");
        }
    }

    pub fn try_rearrange(&self, new_order: &[OverlayEntry]) -> Result<(), OverlayUsageError> {
        for entry in new_order {
            if entry.link_state(self.inner.id) == LinkState::Elsewhere {
                return Err(OverlayUsageError::AttachedElsewhere(entry.id()));
            }
        }
        self.inner.rearrange(new_order.to_vec());
        Ok(())
    }

    pub(crate) fn remove_entry(&self, entry: &OverlayEntry) {
        self.inner.remove(entry);
    }

    /// Schedules a build pass.
    pub fn mark_needs_build(&self) {
        self.inner.mark_needs_build();
    }

    /// Detaches every entry and stops building. Further mutations are
    /// ignored; entries passed to a later insert stay unattached.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }

    /// Snapshot of the current order, bottom first.
    pub fn entries(&self) -> Vec<OverlayEntry> {
        self.inner.state.borrow().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().entries.is_empty()
    }

    pub fn contains(&self, entry: &OverlayEntry) -> bool {
        self.inner.state.borrow().position(entry).is_some()
    }

    pub fn is_building(&self) -> bool {
        self.inner.state.borrow().building
    }

    pub fn pending_op_count(&self) -> usize {
        self.inner.state.borrow().pending.len()
    }

    /// Index of the lowest opaque entry as of the last build pass.
    pub fn opaque_index(&self) -> Option<usize> {
        self.inner.state.borrow().opaque_index
    }

    /// Number of completed build passes.
    pub fn build_count(&self) -> u64 {
        self.inner.builds.get()
    }

    pub fn render_object(&self) -> Rc<RefCell<RenderOverlay>> {
        Rc::clone(&self.inner.render)
    }

    /// The render object as the root box of a pipeline.
    pub fn render_box(&self) -> Rc<RefCell<dyn RenderBox>> {
        let render: Rc<RefCell<dyn RenderBox>> = self.inner.render.clone();
        render
    }

    pub fn ptr_eq(&self, other: &OverlayStack) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for OverlayStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("OverlayStack")
            .field("id", &self.inner.id)
            .field("entries", &state.entries.len())
            .field("building", &state.building)
            .field("pending", &state.pending.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl StackInner {
    fn link(&self) -> StackLink {
        StackLink {
            id: self.id,
            stack: self.self_weak.clone(),
        }
    }

    fn check_unlinked(&self, entry: &OverlayEntry) -> Result<(), OverlayUsageError> {
        match entry.link_state(self.id) {
            LinkState::Unlinked => Ok(()),
            LinkState::Here => Err(OverlayUsageError::AlreadyAttached(entry.id())),
            LinkState::Elsewhere => Err(OverlayUsageError::AttachedElsewhere(entry.id())),
        }
    }

    fn context(&self) -> BuildContext {
        BuildContext::root(&self.owner).provide(OverlayScope {
            stack: self.self_weak.clone(),
        })
    }

    fn mark_needs_build(&self) {
        if let Some(handle) = self.element.borrow().as_ref() {
            handle.mark_needs_build();
        }
    }

    /// Links `entry` right away and splices it in now or after the
    /// current build pass.
    fn insert(
        &self,
        entry: &OverlayEntry,
        below: Option<&OverlayEntry>,
        above: Option<&OverlayEntry>,
    ) {
        let mut state = self.state.borrow_mut();
        if state.disposed {
            log::debug!("ignoring insert into disposed overlay {:?}", self.id);
            return;
        }
        entry.set_link(self.link());
        if state.building {
            log::debug!(
                "overlay {:?} is building; queueing insert of entry {}",
                self.id,
                entry.id()
            );
            state.pending.push(PendingOp::Insert {
                entry: entry.clone(),
                below: below.cloned(),
                above: above.cloned(),
            });
            return;
        }
        drop(state);
        self.insert_now(entry, below, above);
    }

    fn insert_now(
        &self,
        entry: &OverlayEntry,
        below: Option<&OverlayEntry>,
        above: Option<&OverlayEntry>,
    ) {
        if !entry.is_linked_to(self.id) {
            log::trace!("entry {} left overlay {:?} before insertion", entry.id(), self.id);
            return;
        }
        let mut state = self.state.borrow_mut();
        if state.disposed || state.position(entry).is_some() {
            return;
        }
        let index = match (below, above) {
            (Some(below), _) => state.position(below).unwrap_or(0),
            (None, Some(above)) => state
                .position(above)
                .map(|index| index + 1)
                .unwrap_or(state.entries.len()),
            (None, None) => state.entries.len(),
        };
        state.entries.insert(index, entry.clone());
        drop(state);
        log::debug!(
            "overlay {:?}: inserted entry {} at {index}",
            self.id,
            entry.id()
        );
        self.mark_needs_build();
    }

    fn remove(&self, entry: &OverlayEntry) {
        if !entry.is_linked_to(self.id) {
            return;
        }
        {
            let mut state = self.state.borrow_mut();
            if state.building {
                log::debug!(
                    "overlay {:?} is building; queueing removal of entry {}",
                    self.id,
                    entry.id()
                );
                state.pending.push(PendingOp::Remove {
                    entry: entry.clone(),
                });
                return;
            }
        }
        self.remove_now(entry);
    }

    fn remove_now(&self, entry: &OverlayEntry) {
        // References go first so the entry reads as detached before it
        // leaves the sequence.
        if !entry.clear_link_if(self.id) {
            return;
        }
        self.state
            .borrow_mut()
            .entries
            .retain(|e| !e.ptr_eq(entry));
        log::debug!("overlay {:?}: removed entry {}", self.id, entry.id());
        self.mark_needs_build();
    }

    fn rearrange(&self, new_order: Vec<OverlayEntry>) {
        let mut state = self.state.borrow_mut();
        if state.disposed {
            log::debug!("ignoring rearrange of disposed overlay {:?}", self.id);
            return;
        }
        if state.building {
            for entry in &new_order {
                entry.set_link(self.link());
            }
            log::debug!("overlay {:?} is building; queueing rearrange", self.id);
            state.pending.push(PendingOp::Rearrange { entries: new_order });
            return;
        }
        drop(state);
        self.rearrange_now(new_order);
    }

    fn rearrange_now(&self, new_order: Vec<OverlayEntry>) {
        let mut next: Vec<OverlayEntry> = Vec::with_capacity(new_order.len());
        for entry in new_order {
            if next.iter().any(|e| e.ptr_eq(&entry)) {
                continue;
            }
            if entry.link_state(self.id) == LinkState::Elsewhere {
                log::warn!(
                    "entry {} moved to another overlay before rearrange ran",
                    entry.id()
                );
                continue;
            }
            next.push(entry);
        }

        let previous = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            std::mem::take(&mut state.entries)
        };
        let mut detached = 0;
        for entry in &previous {
            if !next.iter().any(|e| e.ptr_eq(entry)) && entry.clear_link_if(self.id) {
                detached += 1;
            }
        }
        for entry in &next {
            entry.set_link(self.link());
        }
        log::debug!(
            "overlay {:?}: rearranged to {} entries, detached {detached}",
            self.id,
            next.len()
        );
        self.state.borrow_mut().entries = next;
        self.mark_needs_build();
    }

    fn apply(&self, op: PendingOp) {
        match op {
            PendingOp::Insert {
                entry,
                below,
                above,
            } => self.insert_now(&entry, below.as_ref(), above.as_ref()),
            PendingOp::Remove { entry } => self.remove_now(&entry),
            PendingOp::Rearrange { entries } => self.rearrange_now(entries),
        }
    }

    /// Builds every entry, then applies the mutations queued meanwhile.
    fn build_pass(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.building = true;
        }
        let guard = BuildingGuard { inner: self };
        let context = self.context();

        if let Some(child) = &self.child {
            self.child_slot.set_content(child(&context));
        }

        let snapshot = self.state.borrow().entries.clone();
        let mut children = Vec::with_capacity(snapshot.len());
        let mut opaque_index = None;
        for entry in &snapshot {
            if !entry.is_linked_to(self.id) {
                continue;
            }
            let element = self.mount(entry, &context);
            element.build();
            if opaque_index.is_none() && entry.is_opaque() {
                opaque_index = Some(children.len());
            }
            children.push(OverlayChild {
                id: entry.id(),
                slot: Rc::clone(&element.slot),
            });
        }
        self.unmount_stale(&children);

        let (pending, disposed) = {
            let mut state = self.state.borrow_mut();
            state.building = false;
            state.opaque_index = opaque_index;
            (std::mem::take(&mut state.pending), state.disposed)
        };
        drop(guard);

        if disposed {
            self.render.borrow_mut().clear();
            return;
        }
        self.render.borrow_mut().set_children(children, opaque_index);
        self.builds.set(self.builds.get() + 1);
        self.dispatch_ready();

        if !pending.is_empty() {
            log::debug!(
                "overlay {:?}: applying {} queued operation(s)",
                self.id,
                pending.len()
            );
            for op in pending {
                self.apply(op);
            }
            self.mark_needs_build();
        }
    }

    fn mount(&self, entry: &OverlayEntry, context: &BuildContext) -> Rc<EntryElement> {
        let existing = self.state.borrow().mounted.get(&entry.id()).cloned();
        if let Some(element) = existing {
            if let Some(handle) = element.handle.borrow().as_ref() {
                if entry.mount_handle().map(|h| h.id()) != Some(handle.id()) {
                    entry.set_mount(handle.clone());
                }
            }
            return element;
        }

        let element = Rc::new(EntryElement {
            entry: entry.downgrade(),
            slot: Rc::new(RenderSlot::new()),
            context: context.clone(),
            handle: RefCell::new(None),
        });
        let weak: Weak<dyn Element> = Rc::downgrade(&element) as Weak<dyn Element>;
        let handle = self.owner.register(weak);
        *element.handle.borrow_mut() = Some(handle.clone());
        entry.set_mount(handle);
        self.state
            .borrow_mut()
            .mounted
            .insert(entry.id(), Rc::clone(&element));
        log::trace!("overlay {:?}: mounted entry {}", self.id, entry.id());
        element
    }

    fn unmount_stale(&self, live: &[OverlayChild]) {
        let stale: Vec<Rc<EntryElement>> = {
            let mut state = self.state.borrow_mut();
            let ids: Vec<EntryId> = state
                .mounted
                .keys()
                .filter(|id| !live.iter().any(|child| child.id == **id))
                .copied()
                .collect();
            ids.iter()
                .filter_map(|id| state.mounted.shift_remove(id))
                .collect()
        };
        for element in stale {
            element.unmount();
        }
    }

    fn dispatch_ready(&self) {
        let Some(callback) = self.on_ready.borrow_mut().take() else {
            return;
        };
        let stack = self.self_weak.clone();
        self.owner.runtime().dispatch(move || {
            if let Some(inner) = stack.upgrade() {
                callback(&OverlayStack::from_inner(inner));
            }
        });
    }

    fn dispose(&self) {
        let (entries, mounted) = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.pending.clear();
            (
                std::mem::take(&mut state.entries),
                std::mem::take(&mut state.mounted),
            )
        };
        for entry in &entries {
            entry.clear_link_if(self.id);
        }
        for element in mounted.into_values() {
            element.unmount();
        }
        if let Some(handle) = self.element.borrow_mut().take() {
            handle.unregister();
        }
        self.on_ready.borrow_mut().take();
        if let Ok(mut render) = self.render.try_borrow_mut() {
            render.clear();
        }
        self.child_slot.clear();
        log::debug!(
            "disposed overlay {:?}, detached {} entries",
            self.id,
            entries.len()
        );
    }
}

impl Element for StackInner {
    fn rebuild(&self) {
        self.build_pass();
    }
}

impl Drop for StackInner {
    fn drop(&mut self) {
        let id = self.id;
        let state = self.state.get_mut();
        for entry in state.entries.drain(..) {
            entry.clear_link_if(id);
        }
        for element in state.mounted.values() {
            if let Some(handle) = element.handle.borrow().as_ref() {
                handle.unregister();
            }
        }
        if let Some(handle) = self.element.get_mut().take() {
            handle.unregister();
        }
    }
}

struct BuildingGuard<'a> {
    inner: &'a StackInner,
}

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.state.try_borrow_mut() {
            state.building = false;
        }
    }
}

/// Mounted content of one entry.
struct EntryElement {
    entry: WeakOverlayEntry,
    slot: Rc<RenderSlot>,
    context: BuildContext,
    handle: RefCell<Option<ElementHandle>>,
}

impl EntryElement {
    fn build(&self) {
        let Some(entry) = self.entry.upgrade() else {
            return;
        };
        let Some(handle) = self.handle.borrow().clone() else {
            return;
        };
        if entry.mount_handle().map(|h| h.id()) != Some(handle.id()) {
            return;
        }
        // Cleared first so the builder may mark the entry dirty again.
        self.context.owner().clear_dirty(handle.id());
        let builder = entry.builder();
        let content = builder(&self.context);
        self.slot.set_content(content);
    }

    fn unmount(&self) {
        let handle = self.handle.borrow_mut().take();
        if let Some(handle) = handle {
            handle.unregister();
            if let Some(entry) = self.entry.upgrade() {
                entry.clear_mount_if(&handle);
            }
        }
        self.slot.clear();
    }
}

impl Element for EntryElement {
    fn rebuild(&self) {
        self.build();
    }
}

#[cfg(test)]
#[path = "tests/stack_tests.rs"]
mod tests;
