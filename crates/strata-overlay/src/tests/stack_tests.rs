use super::*;
use crate::content::SizedBox;
use std::sync::Arc;
use std::time::Duration;
use strata_core::{Clock, DefaultScheduler, FrameScheduler, SchedulerConfig, SettleError};
use strata_ui_graphics::{Color, PaintOp, Point, Rect, Size};

#[derive(Default)]
struct ManualClock {
    now: Cell<Duration>,
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

struct Harness {
    scheduler: FrameScheduler,
    stack: OverlayStack,
}

impl Harness {
    fn new(config: OverlayConfig) -> Self {
        let clock: Rc<dyn Clock> = Rc::new(ManualClock::default());
        let mut scheduler = FrameScheduler::new(
            Arc::new(DefaultScheduler),
            clock,
            SchedulerConfig::default().with_surface_size(Size::new(400.0, 400.0)),
        );
        let stack = OverlayStack::new(scheduler.build_owner(), config);
        scheduler.set_root(stack.render_box());
        Self { scheduler, stack }
    }

    fn pump(&mut self) {
        self.scheduler.pump();
    }

    fn hit(&self, x: f32, y: f32) -> Option<Vec<String>> {
        self.scheduler
            .hit_test(Point::new(x, y))
            .map(|result| result.labels().into_iter().map(String::from).collect())
    }

    fn ids(&self) -> Vec<EntryId> {
        self.stack.entries().iter().map(OverlayEntry::id).collect()
    }
}

fn labeled(label: &'static str) -> OverlayEntry {
    OverlayEntry::new(move |_| SizedBox::expand().label(label).boxed())
}

fn blank() -> OverlayEntry {
    OverlayEntry::new(|_| SizedBox::expand().boxed())
}

fn counting(builds: &Rc<Cell<usize>>) -> OverlayEntry {
    let builds = Rc::clone(builds);
    OverlayEntry::new(move |_| {
        builds.set(builds.get() + 1);
        SizedBox::expand().boxed()
    })
}

#[test]
fn insert_links_immediately_and_mounts_on_next_pump() {
    let mut h = Harness::new(OverlayConfig::new());
    let entry = blank();

    h.stack.insert(&entry, None, None);

    assert!(entry.is_attached());
    assert!(!entry.is_mounted());
    assert!(entry.stack().is_some_and(|stack| stack.ptr_eq(&h.stack)));

    h.pump();
    assert!(entry.is_mounted());
    assert_eq!(h.stack.build_count(), 1);
}

#[test]
fn insert_resolves_anchors() {
    let h = Harness::new(OverlayConfig::new());
    let a = blank();
    let b = blank();
    let c = blank();
    let d = blank();
    let e = blank();
    let detached = blank();

    h.stack.insert(&a, None, None);
    h.stack.insert(&b, None, None);
    h.stack.insert(&c, Some(&b), None);
    h.stack.insert(&d, None, Some(&a));
    h.stack.insert(&e, Some(&detached), None);

    assert_eq!(h.ids(), vec![e.id(), a.id(), d.id(), c.id(), b.id()]);

    let f = blank();
    h.stack.insert(&f, None, Some(&detached));
    assert_eq!(h.stack.entries().last(), Some(&f));
}

#[test]
#[should_panic(expected = "already attached")]
fn inserting_attached_entry_panics() {
    let h = Harness::new(OverlayConfig::new());
    let entry = blank();
    h.stack.insert(&entry, None, None);
    h.stack.insert(&entry, None, None);
}

#[test]
fn try_insert_reports_usage_errors() {
    let h = Harness::new(OverlayConfig::new());
    let other = OverlayStack::new(h.scheduler.build_owner(), OverlayConfig::new());
    let anchor = blank();
    let entry = blank();
    h.stack.insert(&anchor, None, None);

    assert_eq!(
        h.stack.try_insert(&entry, Some(&anchor), Some(&anchor)),
        Err(OverlayUsageError::BothBelowAndAbove)
    );
    assert!(!entry.is_attached());

    other.insert(&entry, None, None);
    assert_eq!(
        h.stack.try_insert(&entry, None, None),
        Err(OverlayUsageError::AttachedElsewhere(entry.id()))
    );
    assert_eq!(
        other.try_insert(&entry, None, None),
        Err(OverlayUsageError::AlreadyAttached(entry.id()))
    );
    assert!(!h.stack.contains(&entry));
}

#[test]
fn insert_all_keeps_input_order() {
    let h = Harness::new(OverlayConfig::new());
    let top = blank();
    h.stack.insert(&top, None, None);
    let group = [blank(), blank(), blank()];

    h.stack.insert_all(&group, Some(&top), None);
    let mut expected: Vec<EntryId> = group.iter().map(OverlayEntry::id).collect();
    expected.push(top.id());
    assert_eq!(h.ids(), expected);

    let later = [blank(), blank()];
    h.stack.insert_all(&later, None, None);
    assert_eq!(&h.ids()[4..], &[later[0].id(), later[1].id()]);
}

#[test]
fn insert_all_above_anchor_stacks_each_entry_over_it() {
    let h = Harness::new(OverlayConfig::new());
    let anchor = blank();
    let top = blank();
    h.stack.insert_all(&[anchor.clone(), top.clone()], None, None);
    let first = blank();
    let second = blank();

    h.stack.insert_all(&[first.clone(), second.clone()], None, Some(&anchor));

    assert_eq!(h.ids(), vec![anchor.id(), second.id(), first.id(), top.id()]);
    assert!(first.is_attached() && second.is_attached());
}

#[test]
fn insert_all_validates_before_inserting() {
    let h = Harness::new(OverlayConfig::new());
    let attached = blank();
    h.stack.insert(&attached, None, None);
    let fresh = blank();

    let result = h.stack.try_insert_all(&[fresh.clone(), attached.clone()], None, None);

    assert_eq!(result, Err(OverlayUsageError::AlreadyAttached(attached.id())));
    assert!(!fresh.is_attached());
    assert_eq!(h.stack.len(), 1);
}

#[test]
fn remove_is_idempotent() {
    let mut h = Harness::new(OverlayConfig::new());
    let entry = blank();
    h.stack.insert(&entry, None, None);
    h.pump();
    assert!(entry.is_mounted());

    entry.remove();
    entry.remove();
    entry.remove();
    h.pump();

    assert!(!entry.is_attached());
    assert!(!entry.is_mounted());
    assert!(h.stack.is_empty());

    entry.remove();
    assert!(h.stack.is_empty());
}

#[test]
fn remove_on_unattached_entry_is_noop() {
    let entry = blank();
    entry.remove();
    entry.mark_needs_build();
    assert!(!entry.is_attached());
}

#[test]
fn insert_from_builder_is_queued_until_pass_ends() {
    let mut h = Harness::new(OverlayConfig::new());
    let late = blank();
    let observed = Rc::new(RefCell::new(None));
    let fired = Rc::new(Cell::new(false));
    let host = {
        let late = late.clone();
        let observed = Rc::clone(&observed);
        let fired = Rc::clone(&fired);
        OverlayEntry::new(move |context| {
            if !fired.replace(true) {
                if let Some(stack) = OverlayStack::of(context) {
                    stack.insert(&late, None, None);
                    *observed.borrow_mut() = Some((
                        late.is_attached(),
                        stack.is_building(),
                        stack.pending_op_count(),
                        stack.len(),
                    ));
                }
            }
            SizedBox::expand().boxed()
        })
    };
    h.stack.insert(&host, None, None);

    h.pump();

    assert_eq!(*observed.borrow(), Some((true, true, 1, 1)));
    assert_eq!(h.ids(), vec![host.id(), late.id()]);
    assert_eq!(h.stack.pending_op_count(), 0);
    assert!(!late.is_mounted());
    assert!(h.scheduler.needs_work());

    h.pump();
    assert!(late.is_mounted());
    assert_eq!(h.stack.render_object().borrow().entry_count(), 2);
}

#[test]
fn remove_from_builder_is_queued() {
    let mut h = Harness::new(OverlayConfig::new());
    let slot: Rc<RefCell<Option<WeakOverlayEntry>>> = Rc::new(RefCell::new(None));
    let entry = {
        let slot = Rc::clone(&slot);
        OverlayEntry::new(move |_| {
            let me = slot.borrow().as_ref().and_then(WeakOverlayEntry::upgrade);
            if let Some(me) = me {
                me.remove();
                me.remove();
            }
            SizedBox::expand().boxed()
        })
    };
    *slot.borrow_mut() = Some(entry.downgrade());
    h.stack.insert(&entry, None, None);

    h.pump();

    assert!(!entry.is_attached());
    assert!(!entry.is_mounted());
    assert!(h.stack.is_empty());
}

#[test]
fn remove_cancels_insert_queued_in_same_pass() {
    let mut h = Harness::new(OverlayConfig::new());
    let late = blank();
    let fired = Rc::new(Cell::new(false));
    let host = {
        let late = late.clone();
        let fired = Rc::clone(&fired);
        OverlayEntry::new(move |context| {
            if !fired.replace(true) {
                if let Some(stack) = OverlayStack::of(context) {
                    stack.insert(&late, None, None);
                    late.remove();
                }
            }
            SizedBox::expand().boxed()
        })
    };
    h.stack.insert(&host, None, None);

    h.pump();
    h.pump();

    assert!(!late.is_attached());
    assert!(!late.is_mounted());
    assert_eq!(h.ids(), vec![host.id()]);
    assert_eq!(h.stack.render_object().borrow().entry_count(), 1);
}

#[test]
fn rearrange_detaches_missing_entries() {
    let h = Harness::new(OverlayConfig::new());
    let a = blank();
    let b = blank();
    let c = blank();
    h.stack.insert_all(&[a.clone(), b.clone(), c.clone()], None, None);

    h.stack.rearrange(&[c.clone(), a.clone(), c.clone()]);

    assert_eq!(h.ids(), vec![c.id(), a.id()]);
    assert!(!b.is_attached());
    assert!(a.is_attached() && c.is_attached());

    h.stack.rearrange(&[]);
    assert!(h.stack.is_empty());
    assert!(!a.is_attached());
    assert!(!c.is_attached());
}

#[test]
fn rearrange_attaches_new_entries() {
    let mut h = Harness::new(OverlayConfig::new());
    let fresh = blank();
    h.stack.rearrange(&[fresh.clone()]);
    assert!(fresh.is_attached());
    h.pump();
    assert!(fresh.is_mounted());
}

#[test]
fn rearrange_rejects_entries_of_other_overlays() {
    let h = Harness::new(OverlayConfig::new());
    let other = OverlayStack::new(h.scheduler.build_owner(), OverlayConfig::new());
    let foreign = blank();
    other.insert(&foreign, None, None);

    assert_eq!(
        h.stack.try_rearrange(&[foreign.clone()]),
        Err(OverlayUsageError::AttachedElsewhere(foreign.id()))
    );
    assert!(other.contains(&foreign));
}

#[test]
fn rearrange_during_build_links_now_and_reorders_after() {
    let mut h = Harness::new(OverlayConfig::new());
    let fresh = blank();
    let linked_during_build = Rc::new(Cell::new(false));
    let fired = Rc::new(Cell::new(false));
    let slot: Rc<RefCell<Option<WeakOverlayEntry>>> = Rc::new(RefCell::new(None));
    let host = {
        let fresh = fresh.clone();
        let linked = Rc::clone(&linked_during_build);
        let fired = Rc::clone(&fired);
        let slot = Rc::clone(&slot);
        OverlayEntry::new(move |context| {
            let me = slot.borrow().as_ref().and_then(WeakOverlayEntry::upgrade);
            if let (Some(stack), Some(me)) = (OverlayStack::of(context), me) {
                if !fired.replace(true) {
                    stack.rearrange(&[fresh.clone(), me]);
                    linked.set(fresh.is_attached() && stack.len() == 1);
                }
            }
            SizedBox::expand().boxed()
        })
    };
    *slot.borrow_mut() = Some(host.downgrade());
    h.stack.insert(&host, None, None);

    h.pump();

    assert!(linked_during_build.get());
    assert_eq!(h.ids(), vec![fresh.id(), host.id()]);
}

#[test]
fn opaque_entry_blocks_page_but_not_lower_entries() {
    let config = OverlayConfig::new().with_child(|_| SizedBox::expand().label("page").boxed());
    let mut h = Harness::new(config);
    let lower = OverlayEntry::new(|_| SizedBox::new(10.0, 10.0).label("lower").boxed());
    let blocker = blank().with_opaque(true);
    h.stack.insert_all(&[lower.clone(), blocker.clone()], None, None);
    h.pump();

    assert_eq!(h.stack.opaque_index(), Some(1));
    assert_eq!(h.hit(5.0, 5.0), Some(vec!["lower".to_string()]));
    assert_eq!(h.hit(200.0, 200.0), None);

    blocker.set_opaque(false);
    h.pump();

    assert_eq!(h.stack.opaque_index(), None);
    assert_eq!(h.hit(200.0, 200.0), Some(vec!["page".to_string()]));
    assert_eq!(h.hit(500.0, 5.0), None);
}

#[test]
fn occlusion_starts_at_first_opaque_entry() {
    let mut h = Harness::new(OverlayConfig::new());
    let below = OverlayEntry::new(|_| SizedBox::new(10.0, 10.0).color(Color::RED).boxed());
    let opaque = OverlayEntry::new(|_| SizedBox::new(20.0, 30.0).color(Color::GREEN).boxed())
        .with_opaque(true);
    let above = OverlayEntry::new(|_| SizedBox::new(40.0, 40.0).color(Color::BLUE).boxed());
    h.stack
        .insert_all(&[below, opaque, above], None, None);
    h.pump();

    let frame = h.scheduler.last_frame();
    assert_eq!(
        frame.occlusions().copied().collect::<Vec<_>>(),
        vec![Rect::new(0.0, 0.0, 20.0, 30.0), Rect::new(0.0, 0.0, 40.0, 40.0)]
    );
    assert_eq!(
        frame.operations(),
        &[
            PaintOp::FillRect {
                rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                color: Color::RED
            },
            PaintOp::Occlude {
                rect: Rect::new(0.0, 0.0, 20.0, 30.0)
            },
            PaintOp::FillRect {
                rect: Rect::new(0.0, 0.0, 20.0, 30.0),
                color: Color::GREEN
            },
            PaintOp::Occlude {
                rect: Rect::new(0.0, 0.0, 40.0, 40.0)
            },
            PaintOp::FillRect {
                rect: Rect::new(0.0, 0.0, 40.0, 40.0),
                color: Color::BLUE
            },
        ]
    );
}

#[test]
fn overlay_without_child_fills_surface() {
    let mut h = Harness::new(OverlayConfig::new());
    h.pump();
    assert_eq!(
        h.stack.render_object().borrow().size(),
        Size::new(400.0, 400.0)
    );
}

#[test]
fn ready_callback_runs_once_after_first_build() {
    let calls = Rc::new(Cell::new(0));
    let config = {
        let calls = Rc::clone(&calls);
        OverlayConfig::new().with_on_ready(move |stack| {
            assert!(!stack.is_building());
            calls.set(calls.get() + 1);
        })
    };
    let mut h = Harness::new(config);

    h.pump();
    assert_eq!(calls.get(), 0);
    h.pump();
    assert_eq!(calls.get(), 1);

    h.stack.mark_needs_build();
    h.pump();
    h.pump();
    assert_eq!(calls.get(), 1);
}

#[test]
fn marking_entry_rebuilds_only_that_entry() {
    let mut h = Harness::new(OverlayConfig::new());
    let a_builds = Rc::new(Cell::new(0));
    let b_builds = Rc::new(Cell::new(0));
    let a = counting(&a_builds);
    let b = counting(&b_builds);
    h.stack.insert_all(&[a.clone(), b.clone()], None, None);
    h.pump();
    assert_eq!((a_builds.get(), b_builds.get()), (1, 1));

    a.mark_needs_build();
    h.pump();

    assert_eq!((a_builds.get(), b_builds.get()), (2, 1));
    assert_eq!(h.stack.build_count(), 1);
}

#[test]
fn every_entry_builds_on_each_pass() {
    let mut h = Harness::new(OverlayConfig::new());
    let builds = Rc::new(Cell::new(0));
    let covered = counting(&builds);
    h.stack
        .insert_all(&[covered, blank().with_opaque(true)], None, None);
    h.pump();
    h.stack.mark_needs_build();
    h.pump();
    assert_eq!(builds.get(), 2);
}

#[test]
fn settle_converges_for_static_entry() {
    let mut h = Harness::new(OverlayConfig::new());
    h.stack.insert(&blank(), None, None);
    assert_eq!(h.scheduler.pump_and_settle(Duration::from_secs(1)), Ok(1));
}

#[test]
fn settle_times_out_for_self_dirtying_entry() {
    let mut h = Harness::new(OverlayConfig::new());
    let slot: Rc<RefCell<Option<WeakOverlayEntry>>> = Rc::new(RefCell::new(None));
    let entry = {
        let slot = Rc::clone(&slot);
        OverlayEntry::new(move |_| {
            let me = slot.borrow().as_ref().and_then(WeakOverlayEntry::upgrade);
            if let Some(me) = me {
                me.mark_needs_build();
            }
            SizedBox::expand().boxed()
        })
    };
    *slot.borrow_mut() = Some(entry.downgrade());
    h.stack.insert(&entry, None, None);

    let result = h.scheduler.pump_and_settle(Duration::from_millis(320));

    assert!(matches!(result, Err(SettleError::Timeout { frames: 20, .. })));
}

#[test]
fn dispose_detaches_everything() {
    let mut h = Harness::new(OverlayConfig::new());
    let a = blank();
    let b = blank();
    h.stack.insert_all(&[a.clone(), b.clone()], None, None);
    h.pump();

    h.stack.dispose();

    assert!(h.stack.is_disposed());
    assert!(h.stack.is_empty());
    assert!(!a.is_attached() && !a.is_mounted());
    assert!(!b.is_attached() && !b.is_mounted());

    let late = blank();
    h.stack.insert(&late, None, None);
    assert!(!late.is_attached());
    h.pump();
    assert_eq!(h.stack.render_object().borrow().entry_count(), 0);
}

#[test]
fn dropping_stack_detaches_entries() {
    let h = Harness::new(OverlayConfig::new());
    let entry = blank();
    h.stack.insert(&entry, None, None);
    let Harness { scheduler, stack } = h;
    drop(scheduler);
    drop(stack);

    assert!(!entry.is_attached());
    entry.remove();
}

#[test]
fn entry_ids_are_unique_and_increasing() {
    let first = blank();
    let second = blank();
    assert!(second.id() > first.id());
    assert_ne!(first, second);
    assert_eq!(first.clone(), first);
}
