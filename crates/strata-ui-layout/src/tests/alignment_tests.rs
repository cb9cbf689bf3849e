use super::*;

#[test]
fn center_splits_slack_evenly() {
    let offset = Alignment::CENTER.align(Size::new(400.0, 400.0), Size::new(100.0, 40.0));
    assert_eq!(offset, Point::new(150.0, 180.0));
}

#[test]
fn bottom_center_pins_to_bottom_edge() {
    let offset = Alignment::BOTTOM_CENTER.align(Size::new(400.0, 400.0), Size::new(200.0, 100.0));
    assert_eq!(offset, Point::new(100.0, 300.0));
}

#[test]
fn oversized_child_sits_at_origin() {
    let offset = Alignment::new(1.0, 0.0).align(Size::new(50.0, 50.0), Size::new(80.0, 80.0));
    assert_eq!(offset, Point::ZERO);
}

#[test]
fn bias_outside_range_is_clamped() {
    let offset = Alignment::new(3.0, -2.0).align(Size::new(100.0, 100.0), Size::new(20.0, 20.0));
    assert_eq!(offset, Point::new(80.0, 0.0));
}
