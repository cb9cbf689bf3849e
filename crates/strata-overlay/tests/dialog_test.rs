//! Dialogs and bottom sheets driven through the headless harness.

use std::cell::Cell;
use std::rc::Rc;

use strata_overlay::{
    show_dialog, show_dialog_in, show_modal_bottom_sheet, BottomSheetOptions, DialogOptions,
    DismissHandle, OverlayConfig, SizedBox, MODAL_BARRIER_LABEL,
};
use strata_testing::OverlayTestRule;
use strata_ui_graphics::{Color, Rect};

fn page() -> OverlayConfig {
    OverlayConfig::new().with_child(|_| SizedBox::expand().label("page").boxed())
}

fn dialog_box() -> DialogOptions {
    DialogOptions::new(|_, _| SizedBox::new(100.0, 100.0).label("dialog").boxed())
}

#[test]
fn dialog_sits_above_barrier_and_hides_page() {
    let mut rule = OverlayTestRule::with_size(400.0, 400.0);
    let stack = rule.set_overlay(page());
    assert_eq!(rule.hit_labels(5.0, 5.0), vec!["page"]);

    let handle = show_dialog(&stack, dialog_box());
    rule.pump();

    assert_eq!(stack.len(), 2);
    assert_eq!(stack.opaque_index(), Some(1));
    assert_eq!(rule.hit_labels(5.0, 5.0), vec![MODAL_BARRIER_LABEL]);
    assert_eq!(rule.hit_labels(200.0, 200.0), vec!["dialog"]);
    assert!(!handle.is_dismissed());
}

#[test]
fn tapping_barrier_dismisses_dialog() {
    let mut rule = OverlayTestRule::with_size(400.0, 400.0);
    let stack = rule.set_overlay(page());
    let handle = show_dialog(&stack, dialog_box());
    rule.pump();

    assert!(rule.tap(5.0, 5.0));
    assert!(handle.is_dismissed());
    assert!(stack.is_empty());
    rule.pump();
    assert_eq!(rule.hit_labels(200.0, 200.0), vec!["page"]);
}

#[test]
fn persistent_dialog_ignores_barrier_taps() {
    let mut rule = OverlayTestRule::with_size(400.0, 400.0);
    let stack = rule.set_overlay(page());
    let handle = show_dialog(&stack, dialog_box().persistent(true));
    rule.pump();

    assert!(!rule.tap(5.0, 5.0));
    rule.pump();
    assert!(!handle.is_dismissed());
    assert_eq!(stack.len(), 2);
    assert_eq!(rule.hit_labels(5.0, 5.0), vec![MODAL_BARRIER_LABEL]);
}

#[test]
fn dismiss_runs_once() {
    let mut rule = OverlayTestRule::with_size(400.0, 400.0);
    let stack = rule.set_overlay(page());
    let handle = show_dialog(&stack, dialog_box());
    rule.pump();
    let (barrier, content) = handle.entries().expect("entries while shown");

    handle.dismiss();
    handle.dismiss();
    rule.pump();

    assert!(handle.is_dismissed());
    assert!(!barrier.is_attached());
    assert!(!content.is_attached());
    assert!(handle.entries().is_none());
    assert!(stack.is_empty());
}

#[test]
fn dialog_content_can_dismiss_itself() {
    let mut rule = OverlayTestRule::with_size(400.0, 400.0);
    let stack = rule.set_overlay(page());
    let handle = show_dialog(
        &stack,
        DialogOptions::new(|_, dismiss: &DismissHandle| {
            let dismiss = dismiss.clone();
            SizedBox::new(80.0, 40.0)
                .label("close")
                .on_tap(move || dismiss.dismiss())
                .boxed()
        }),
    );
    rule.pump();

    assert_eq!(rule.hit_labels(200.0, 200.0), vec!["close"]);
    assert!(rule.tap(200.0, 200.0));
    rule.pump();
    assert!(handle.is_dismissed());
    assert_eq!(rule.hit_labels(200.0, 200.0), vec!["page"]);
}

#[test]
fn barrier_color_is_painted_below_occlusion() {
    let mut rule = OverlayTestRule::with_size(400.0, 400.0);
    let stack = rule.set_overlay(OverlayConfig::new());
    let scrim = Color::BLACK.with_alpha(0.5);
    show_dialog(&stack, dialog_box().barrier_color(scrim));
    rule.pump();

    let frame = rule.last_frame();
    let fills: Vec<_> = frame.fills().collect();
    assert_eq!(fills, vec![(&Rect::new(0.0, 0.0, 400.0, 400.0), &scrim)]);
    assert_eq!(frame.occlusions().count(), 1);
}

#[test]
fn default_barrier_paints_nothing() {
    let mut rule = OverlayTestRule::with_size(400.0, 400.0);
    let stack = rule.set_overlay(OverlayConfig::new());
    show_dialog(&stack, dialog_box());
    rule.pump();
    assert_eq!(rule.last_frame().fills().count(), 0);
}

#[test]
fn bottom_sheet_is_pinned_to_bottom_edge() {
    let mut rule = OverlayTestRule::with_size(400.0, 400.0);
    let stack = rule.set_overlay(page());
    let handle = show_modal_bottom_sheet(
        &stack,
        BottomSheetOptions::new(|_, _| SizedBox::new(400.0, 100.0).label("sheet").boxed()),
    );
    rule.pump();

    assert_eq!(rule.hit_labels(200.0, 350.0), vec!["sheet"]);
    assert_eq!(rule.hit_labels(200.0, 299.0), vec![MODAL_BARRIER_LABEL]);

    assert!(rule.tap(200.0, 100.0));
    rule.pump();
    assert!(handle.is_dismissed());
    assert_eq!(rule.hit_labels(200.0, 350.0), vec!["page"]);
}

#[test]
fn show_dialog_in_finds_overlay_from_child_builder() {
    let shown = Rc::new(Cell::new(false));
    let handle_slot: Rc<std::cell::RefCell<Option<DismissHandle>>> = Rc::default();

    let mut rule = OverlayTestRule::with_size(400.0, 400.0);
    let stack = {
        let shown = Rc::clone(&shown);
        let handle_slot = Rc::clone(&handle_slot);
        rule.set_overlay(OverlayConfig::new().with_child(move |context| {
            if !shown.replace(true) {
                *handle_slot.borrow_mut() = Some(show_dialog_in(context, dialog_box()));
            }
            SizedBox::expand().label("page").boxed()
        }))
    };

    // Inserted while the stack was building, so it lands after the pass.
    assert_eq!(stack.len(), 2);
    assert_eq!(rule.hit_labels(200.0, 200.0), vec!["page"]);
    assert_eq!(rule.pump_and_settle(), Ok(1));
    assert_eq!(rule.hit_labels(200.0, 200.0), vec!["dialog"]);

    let handle = handle_slot.borrow_mut().take().expect("dialog shown");
    handle.dismiss();
    rule.pump_and_settle().expect("settles after dismiss");
    assert_eq!(rule.hit_labels(200.0, 200.0), vec!["page"]);
}

#[test]
fn show_dialog_in_without_overlay_is_inert() {
    let mut rule = OverlayTestRule::with_size(100.0, 100.0);
    rule.set_overlay(OverlayConfig::new());
    let context = strata_core::BuildContext::root(rule.build_owner());

    let handle = show_dialog_in(&context, dialog_box());
    assert!(handle.entries().is_none());
    assert_eq!(rule.stack().map(|stack| stack.len()), Some(0));
    handle.dismiss();
    assert!(handle.is_dismissed());
}
