use super::*;
use std::cell::Cell;
use std::sync::atomic::AtomicUsize;

#[test]
fn dispatch_requests_frame_and_wakes_host() {
    let runtime = StdRuntime::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    {
        let wakes = Arc::clone(&wakes);
        runtime.set_frame_waker(move || {
            wakes.fetch_add(1, Ordering::SeqCst);
        });
    }

    runtime.runtime().dispatch(|| {});

    assert!(runtime.take_frame_request());
    assert!(!runtime.take_frame_request());
    assert_eq!(wakes.load(Ordering::SeqCst), 1);

    runtime.clear_frame_waker();
    runtime.runtime().dispatch(|| {});
    assert!(runtime.take_frame_request());
    assert_eq!(wakes.load(Ordering::SeqCst), 1);
}

#[test]
fn frame_scheduler_runs_dispatched_work() {
    let runtime = StdRuntime::new();
    let mut scheduler = runtime.frame_scheduler(SchedulerConfig::default());
    let ran = Rc::new(Cell::new(false));
    {
        let ran = Rc::clone(&ran);
        strata_core::dispatch(move || ran.set(true));
    }

    let stats = scheduler.pump();

    assert_eq!(stats.tasks_run, 1);
    assert!(ran.get());
    assert!(!scheduler.needs_work());
}

#[test]
fn std_clock_is_monotonic_and_ignores_advance() {
    let clock = StdClock::new();
    let first = clock.now();
    clock.advance(Duration::from_secs(60));
    let second = clock.now();
    assert!(second >= first);
    assert!(second < Duration::from_secs(60));
}
