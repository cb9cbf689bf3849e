//! Element registry and dirty tracking for the build phase.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;

use crate::collections::map::HashMap;
use crate::runtime::RuntimeHandle;

/// Identifier of an element registered with a [`BuildOwner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A node that can rebuild its own content when marked dirty.
pub trait Element {
    fn rebuild(&self);
}

struct BuildOwnerInner {
    runtime: RuntimeHandle,
    elements: RefCell<HashMap<ElementId, Weak<dyn Element>>>,
    dirty: RefCell<IndexSet<ElementId>>,
    batch: RefCell<IndexSet<ElementId>>,
    next_id: Cell<u64>,
    flushing: Cell<bool>,
}

/// Owns the dirty set and rebuilds dirty elements once per frame.
#[derive(Clone)]
pub struct BuildOwner {
    inner: Rc<BuildOwnerInner>,
}

impl BuildOwner {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self {
            inner: Rc::new(BuildOwnerInner {
                runtime,
                elements: RefCell::new(HashMap::default()),
                dirty: RefCell::new(IndexSet::new()),
                batch: RefCell::new(IndexSet::new()),
                next_id: Cell::new(1),
                flushing: Cell::new(false),
            }),
        }
    }

    pub fn runtime(&self) -> RuntimeHandle {
        self.inner.runtime.clone()
    }

    /// Registers `element` and returns a handle that can mark it dirty.
    /// Registration alone does not schedule a rebuild.
    pub fn register(&self, element: Weak<dyn Element>) -> ElementHandle {
        let id = ElementId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.elements.borrow_mut().insert(id, element);
        ElementHandle {
            id,
            owner: Rc::downgrade(&self.inner),
        }
    }

    pub fn unregister(&self, id: ElementId) {
        self.inner.unregister(id);
    }

    pub fn is_registered(&self, id: ElementId) -> bool {
        self.inner.elements.borrow().contains_key(&id)
    }

    pub fn element_count(&self) -> usize {
        self.inner.elements.borrow().len()
    }

    pub fn mark_needs_build(&self, id: ElementId) {
        self.inner.mark_needs_build(id);
    }

    /// Drops `id` from the pending work, including the batch being flushed.
    pub fn clear_dirty(&self, id: ElementId) {
        self.inner.clear_dirty(id);
    }

    pub fn is_dirty(&self, id: ElementId) -> bool {
        self.inner.dirty.borrow().contains(&id) || self.inner.batch.borrow().contains(&id)
    }

    pub fn has_dirty(&self) -> bool {
        !self.inner.dirty.borrow().is_empty()
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }

    /// Rebuilds the elements dirty at the time of the call, in the order
    /// they were marked. Elements marked during the flush wait for the next
    /// one. Returns the number of rebuilt elements.
    pub fn flush_build(&self) -> usize {
        let inner = &self.inner;
        if inner.flushing.get() {
            log::warn!("flush_build re-entered; ignoring nested flush");
            return 0;
        }
        let pending = std::mem::take(&mut *inner.dirty.borrow_mut());
        if pending.is_empty() {
            return 0;
        }
        *inner.batch.borrow_mut() = pending;
        inner.flushing.set(true);
        let _guard = FlushGuard { inner };

        let mut rebuilt = 0;
        loop {
            let next = {
                let mut batch = inner.batch.borrow_mut();
                if batch.is_empty() {
                    break;
                }
                batch.shift_remove_index(0)
            };
            let Some(id) = next else { break };
            let element = inner
                .elements
                .borrow()
                .get(&id)
                .and_then(|element| element.upgrade());
            match element {
                Some(element) => {
                    element.rebuild();
                    rebuilt += 1;
                }
                None => inner.unregister(id),
            }
        }
        log::trace!("flush_build rebuilt {rebuilt} element(s)");
        rebuilt
    }
}

impl BuildOwnerInner {
    fn unregister(&self, id: ElementId) {
        self.elements.borrow_mut().remove(&id);
        self.clear_dirty(id);
    }

    fn clear_dirty(&self, id: ElementId) {
        self.dirty.borrow_mut().shift_remove(&id);
        self.batch.borrow_mut().shift_remove(&id);
    }

    fn mark_needs_build(&self, id: ElementId) {
        if !self.elements.borrow().contains_key(&id) {
            log::trace!("ignoring rebuild request for unregistered element {id:?}");
            return;
        }
        if self.batch.borrow().contains(&id) {
            return;
        }
        if self.dirty.borrow_mut().insert(id) {
            self.runtime.request_frame();
        }
    }
}

struct FlushGuard<'a> {
    inner: &'a BuildOwnerInner,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.inner.flushing.set(false);
        self.inner.batch.borrow_mut().clear();
    }
}

impl fmt::Debug for BuildOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOwner")
            .field("elements", &self.inner.elements.borrow().len())
            .field("dirty", &self.inner.dirty.borrow().len())
            .finish()
    }
}

/// Weak handle to a registered element.
#[derive(Clone)]
pub struct ElementHandle {
    id: ElementId,
    owner: Weak<BuildOwnerInner>,
}

impl ElementHandle {
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Schedules a rebuild. No-op once the element is unregistered.
    pub fn mark_needs_build(&self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.mark_needs_build(self.id);
        }
    }

    pub fn is_registered(&self) -> bool {
        self.owner
            .upgrade()
            .map(|owner| owner.elements.borrow().contains_key(&self.id))
            .unwrap_or(false)
    }

    pub fn unregister(&self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.unregister(self.id);
        }
    }
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementHandle").field(&self.id).finish()
    }
}

type InheritedMap = HashMap<TypeId, Rc<dyn Any>>;

/// Context handed to content builders.
///
/// Carries the build owner plus values provided by ancestors, looked up by
/// type.
#[derive(Clone)]
pub struct BuildContext {
    owner: BuildOwner,
    inherited: Rc<InheritedMap>,
}

impl BuildContext {
    pub fn root(owner: &BuildOwner) -> Self {
        Self {
            owner: owner.clone(),
            inherited: Rc::new(InheritedMap::default()),
        }
    }

    pub fn owner(&self) -> &BuildOwner {
        &self.owner
    }

    pub fn runtime(&self) -> RuntimeHandle {
        self.owner.runtime()
    }

    /// Returns a child context that additionally exposes `value`, shadowing
    /// any ancestor value of the same type.
    pub fn provide<T: 'static>(&self, value: T) -> BuildContext {
        let mut inherited = (*self.inherited).clone();
        inherited.insert(TypeId::of::<T>(), Rc::new(value));
        Self {
            owner: self.owner.clone(),
            inherited: Rc::new(inherited),
        }
    }

    pub fn inherited<T: 'static>(&self) -> Option<Rc<T>> {
        self.inherited
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("inherited", &self.inherited.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/build_owner_tests.rs"]
mod tests;
