use super::*;
use crate::platform::DefaultScheduler;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct CountingScheduler {
    frames: AtomicUsize,
}

impl RuntimeScheduler for CountingScheduler {
    fn schedule_frame(&self) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn dispatch_requests_frame() {
    let scheduler = Arc::new(CountingScheduler::default());
    let runtime = Runtime::new(scheduler.clone());
    assert!(!runtime.needs_frame());

    runtime.dispatch(|| {});

    assert!(runtime.needs_frame());
    assert!(runtime.has_pending_tasks());
    assert_eq!(scheduler.frames.load(Ordering::SeqCst), 1);
}

#[test]
fn tasks_enqueued_while_draining_run_on_next_drain() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let log = Rc::new(RefCell::new(Vec::new()));

    {
        let log = Rc::clone(&log);
        let handle = runtime.handle();
        runtime.dispatch(move || {
            log.borrow_mut().push("first");
            let log = Rc::clone(&log);
            handle.dispatch(move || log.borrow_mut().push("nested"));
        });
    }

    assert_eq!(runtime.drain_tasks(), 1);
    assert_eq!(*log.borrow(), vec!["first"]);
    assert!(runtime.has_pending_tasks());

    assert_eq!(runtime.drain_tasks(), 1);
    assert_eq!(*log.borrow(), vec!["first", "nested"]);
    assert!(!runtime.has_pending_tasks());
}

#[test]
fn free_dispatch_targets_latest_runtime() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let ran = Rc::new(Cell::new(false));
    {
        let ran = Rc::clone(&ran);
        dispatch(move || ran.set(true));
    }
    runtime.drain_tasks();
    assert!(ran.get());
}

#[test]
fn dispatch_on_dropped_runtime_is_ignored() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let handle = runtime.handle();
    drop(runtime);
    assert!(!handle.is_alive());
    handle.dispatch(|| panic!("must not run"));
    assert!(current_runtime_handle().is_none());
}

#[test]
fn ticker_reports_elapsed_since_first_step() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = Rc::clone(&seen);
        runtime.start_ticker(move |elapsed| {
            seen.borrow_mut().push(elapsed);
            elapsed < Duration::from_millis(32)
        });
    }

    runtime.step_tickers(Duration::from_millis(100));
    runtime.step_tickers(Duration::from_millis(116));
    assert!(runtime.has_active_tickers());
    runtime.step_tickers(Duration::from_millis(132));

    assert_eq!(
        *seen.borrow(),
        vec![
            Duration::ZERO,
            Duration::from_millis(16),
            Duration::from_millis(32)
        ]
    );
    assert!(!runtime.has_active_tickers());
}

#[test]
fn stopped_ticker_is_not_stepped() {
    let runtime = Runtime::new(Arc::new(DefaultScheduler));
    let count = Rc::new(Cell::new(0));
    let ticker = {
        let count = Rc::clone(&count);
        runtime.start_ticker(move |_| {
            count.set(count.get() + 1);
            true
        })
    };

    runtime.step_tickers(Duration::ZERO);
    ticker.stop();
    runtime.step_tickers(Duration::from_millis(16));

    assert_eq!(count.get(), 1);
    assert!(!ticker.is_active());
    assert!(!runtime.has_active_tickers());
}
