use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::thread_local;
use std::time::Duration;

use crate::platform::RuntimeScheduler;

type LocalTask = Box<dyn FnOnce() + 'static>;
type TickCallback = Box<dyn FnMut(Duration) -> bool + 'static>;

struct TickerEntry {
    active: Rc<Cell<bool>>,
    started_at: Option<Duration>,
    callback: TickCallback,
}

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    needs_frame: Cell<bool>,
    local_tasks: RefCell<VecDeque<LocalTask>>,
    tickers: RefCell<Vec<TickerEntry>>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            needs_frame: Cell::new(false),
            local_tasks: RefCell::new(VecDeque::new()),
            tickers: RefCell::new(Vec::new()),
        }
    }

    fn schedule(&self) {
        self.needs_frame.set(true);
        self.scheduler.schedule_frame();
    }

    fn enqueue_task(&self, task: LocalTask) {
        self.local_tasks.borrow_mut().push_back(task);
        self.schedule();
    }

    /// Runs the tasks queued before this call. Tasks they enqueue wait for
    /// the next drain.
    fn drain_tasks(&self) -> usize {
        let count = self.local_tasks.borrow().len();
        for _ in 0..count {
            let task = self.local_tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        count
    }

    fn has_pending_tasks(&self) -> bool {
        self.local_tasks
            .try_borrow()
            .map(|tasks| !tasks.is_empty())
            .unwrap_or(true)
    }

    fn start_ticker(&self, callback: TickCallback) -> Rc<Cell<bool>> {
        let active = Rc::new(Cell::new(true));
        self.tickers.borrow_mut().push(TickerEntry {
            active: Rc::clone(&active),
            started_at: None,
            callback,
        });
        self.schedule();
        active
    }

    fn step_tickers(&self, now: Duration) -> usize {
        let mut running = std::mem::take(&mut *self.tickers.borrow_mut());
        let mut stepped = 0;
        for entry in running.iter_mut() {
            if !entry.active.get() {
                continue;
            }
            let started_at = *entry.started_at.get_or_insert(now);
            stepped += 1;
            if !(entry.callback)(now.saturating_sub(started_at)) {
                entry.active.set(false);
            }
        }
        running.retain(|entry| entry.active.get());
        let mut tickers = self.tickers.borrow_mut();
        // Tickers started during this step run from the next one.
        let started = std::mem::take(&mut *tickers);
        running.extend(started);
        *tickers = running;
        stepped
    }

    fn has_active_tickers(&self) -> bool {
        self.tickers
            .try_borrow()
            .map(|tickers| tickers.iter().any(|entry| entry.active.get()))
            .unwrap_or(true)
    }
}

/// Single-threaded runtime owning the deferred-callback queue and the
/// active tickers.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        let runtime = Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        };

        // The free `dispatch` function targets the most recent runtime on
        // this thread.
        let handle = runtime.handle();
        LAST_RUNTIME.with(|slot| {
            *slot.borrow_mut() = Some(handle);
        });

        runtime
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Queues `task` to run at the start of the next pump step.
    pub fn dispatch(&self, task: impl FnOnce() + 'static) {
        self.inner.enqueue_task(Box::new(task));
    }

    pub fn drain_tasks(&self) -> usize {
        self.inner.drain_tasks()
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.inner.has_pending_tasks()
    }

    pub fn start_ticker(&self, callback: impl FnMut(Duration) -> bool + 'static) -> TickerHandle {
        let active = self.inner.start_ticker(Box::new(callback));
        TickerHandle { active }
    }

    /// Advances every active ticker with the clock's current time.
    pub fn step_tickers(&self, now: Duration) -> usize {
        self.inner.step_tickers(now)
    }

    pub fn has_active_tickers(&self) -> bool {
        self.inner.has_active_tickers()
    }

    pub fn request_frame(&self) {
        self.inner.schedule();
    }

    pub fn needs_frame(&self) -> bool {
        self.inner.needs_frame.get()
    }

    pub fn set_needs_frame(&self, value: bool) {
        self.inner.needs_frame.set(value);
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("needs_frame", &self.inner.needs_frame.get())
            .field("pending_tasks", &self.inner.has_pending_tasks())
            .finish()
    }
}

/// Weak reference to a [`Runtime`]. Operations on a dropped runtime are
/// ignored.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
}

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn dispatch(&self, task: impl FnOnce() + 'static) {
        match self.inner.upgrade() {
            Some(inner) => inner.enqueue_task(Box::new(task)),
            None => log::trace!("dropping deferred task: runtime is gone"),
        }
    }

    pub fn request_frame(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.schedule();
        }
    }

    pub fn start_ticker(
        &self,
        callback: impl FnMut(Duration) -> bool + 'static,
    ) -> Option<TickerHandle> {
        let inner = self.inner.upgrade()?;
        let active = inner.start_ticker(Box::new(callback));
        Some(TickerHandle { active })
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Controls a ticker started with [`Runtime::start_ticker`].
///
/// The ticker keeps running until its callback returns `false` or
/// [`TickerHandle::stop`] is called. Dropping the handle does not stop it.
#[derive(Clone, Debug)]
pub struct TickerHandle {
    active: Rc<Cell<bool>>,
}

impl TickerHandle {
    pub fn stop(&self) {
        self.active.set(false);
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

thread_local! {
    static LAST_RUNTIME: RefCell<Option<RuntimeHandle>> = const { RefCell::new(None) };
}

/// Returns the most recently created runtime on this thread, if still alive.
pub fn current_runtime_handle() -> Option<RuntimeHandle> {
    LAST_RUNTIME.with(|slot| {
        slot.borrow()
            .as_ref()
            .filter(|handle| handle.is_alive())
            .cloned()
    })
}

/// Queues `task` on the current runtime's deferred-callback queue.
pub fn dispatch(task: impl FnOnce() + 'static) {
    match current_runtime_handle() {
        Some(handle) => handle.dispatch(task),
        None => log::warn!("dispatch called with no live runtime on this thread"),
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
