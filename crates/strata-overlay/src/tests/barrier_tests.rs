use super::*;
use std::cell::Cell;

#[test]
fn barrier_fills_the_space_it_is_given() {
    let mut barrier = ModalBarrier::new(Color::BLACK);
    let size = barrier.layout(Constraints::loose(400.0, 300.0));
    assert_eq!(size, Size::new(400.0, 300.0));

    let mut context = PaintContext::new();
    barrier.paint(&mut context, Point::ZERO);
    let list = context.finish();
    assert_eq!(
        list.fills().collect::<Vec<_>>(),
        vec![(&Rect::new(0.0, 0.0, 400.0, 300.0), &Color::BLACK)]
    );
}

#[test]
fn transparent_barrier_paints_nothing() {
    let mut barrier = ModalBarrier::new(Color::TRANSPARENT);
    barrier.layout(Constraints::loose(100.0, 100.0));
    let mut context = PaintContext::new();
    barrier.paint(&mut context, Point::ZERO);
    assert!(context.finish().is_empty());
}

#[test]
fn dismissible_barrier_taps_dismiss() {
    let dismissed = Rc::new(Cell::new(0));
    let mut barrier = {
        let dismissed = Rc::clone(&dismissed);
        ModalBarrier::new(Color::TRANSPARENT).on_dismiss(move || dismissed.set(dismissed.get() + 1))
    };
    barrier.layout(Constraints::loose(100.0, 100.0));

    let mut result = HitTestResult::new();
    assert!(barrier.hit_test(Point::new(50.0, 50.0), &mut result));
    assert_eq!(result.labels(), vec![MODAL_BARRIER_LABEL]);
    assert!(result.dispatch_tap());
    assert_eq!(dismissed.get(), 1);
}

#[test]
fn persistent_barrier_absorbs_without_dismissing() {
    let dismissed = Rc::new(Cell::new(false));
    let mut barrier = {
        let dismissed = Rc::clone(&dismissed);
        ModalBarrier::new(Color::TRANSPARENT)
            .dismissible(false)
            .semantic_label("Scrim")
            .on_dismiss(move || dismissed.set(true))
    };
    barrier.layout(Constraints::loose(100.0, 100.0));

    let mut result = HitTestResult::new();
    assert!(barrier.hit_test(Point::new(10.0, 10.0), &mut result));
    assert_eq!(result.labels(), vec!["Scrim"]);
    assert!(!result.dispatch_tap());
    assert!(!dismissed.get());
}

#[test]
fn barrier_ignores_hits_outside_bounds() {
    let mut barrier = ModalBarrier::new(Color::TRANSPARENT);
    barrier.layout(Constraints::loose(100.0, 100.0));
    let mut result = HitTestResult::new();
    assert!(!barrier.hit_test(Point::new(150.0, 10.0), &mut result));
    assert!(result.is_empty());
}
