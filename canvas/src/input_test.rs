#![allow(clippy::float_cmp)]

use super::*;

fn canvas() -> Size {
    Size::new(800.0, 600.0)
}

// --- StrokeCapture ---

#[test]
fn default_capture_uses_house_pen() {
    let capture = StrokeCapture::default();
    assert_eq!(capture.color(), "#ADFF2F");
    assert_eq!(capture.width(), 10.0);
    assert!(!capture.is_active());
}

#[test]
fn small_moves_are_skipped() {
    let mut capture = StrokeCapture::new("#000", 10.0);
    capture.pointer_down(Point::new(100.0, 100.0));
    assert_eq!(capture.pointer_move(Point::new(105.0, 110.0)), None);
    assert_eq!(capture.pointer_move(Point::new(90.0, 92.0)), None);

    let segment = capture.pointer_move(Point::new(111.0, 100.0)).expect("segment");
    assert_eq!(segment.from, Point::new(100.0, 100.0));
    assert_eq!(segment.to, Point::new(111.0, 100.0));
}

#[test]
fn threshold_is_measured_from_last_recorded_point() {
    let mut capture = StrokeCapture::new("#000", 10.0);
    capture.pointer_down(Point::new(0.0, 0.0));
    assert!(capture.pointer_move(Point::new(0.0, 20.0)).is_some());
    assert!(capture.pointer_move(Point::new(0.0, 25.0)).is_none());
    assert!(capture.pointer_move(Point::new(0.0, 31.0)).is_some());

    let stroke = capture.pointer_up(PageNumber::FIRST, canvas()).expect("active").expect("valid");
    assert_eq!(stroke.points(), &[Point::new(0.0, 0.0), Point::new(0.0, 20.0), Point::new(0.0, 31.0)]);
}

#[test]
fn pointer_up_builds_stroke_with_canvas_and_pen() {
    let mut capture = StrokeCapture::new("#ff0000", 4.0);
    capture.pointer_down(Point::new(10.0, 10.0));
    capture.pointer_move(Point::new(20.0, 20.0));
    let page = PageNumber::new(3).expect("page");

    let stroke = capture.pointer_up(page, canvas()).expect("active").expect("valid");
    assert_eq!(stroke.page(), page);
    assert_eq!(stroke.color(), "#ff0000");
    assert_eq!(stroke.width(), 4.0);
    assert_eq!(stroke.canvas(), canvas());
    assert!(!capture.is_active());
}

#[test]
fn tap_without_moves_is_a_single_point_stroke() {
    let mut capture = StrokeCapture::default();
    capture.pointer_down(Point::new(5.0, 5.0));
    let stroke = capture.pointer_up(PageNumber::FIRST, canvas()).expect("active").expect("valid");
    assert_eq!(stroke.points().len(), 1);
}

#[test]
fn moves_and_release_without_press_do_nothing() {
    let mut capture = StrokeCapture::default();
    assert_eq!(capture.pointer_move(Point::new(500.0, 500.0)), None);
    assert!(capture.pointer_up(PageNumber::FIRST, canvas()).is_none());
}

#[test]
fn cancel_discards_gesture() {
    let mut capture = StrokeCapture::default();
    capture.pointer_down(Point::new(5.0, 5.0));
    capture.cancel();
    assert!(capture.pointer_up(PageNumber::FIRST, canvas()).is_none());
}

#[test]
fn release_on_unsized_canvas_is_rejected() {
    let mut capture = StrokeCapture::default();
    capture.pointer_down(Point::new(5.0, 5.0));
    let result = capture.pointer_up(PageNumber::FIRST, Size::new(0.0, 0.0)).expect("active");
    assert!(matches!(result, Err(InvalidCommand::Canvas { .. })));
}

// --- NavKey ---

#[test]
fn arrow_left_and_up_go_back() {
    assert_eq!(NavKey::from_key("ArrowLeft"), Some(NavKey::Previous));
    assert_eq!(NavKey::from_key("ArrowUp"), Some(NavKey::Previous));
}

#[test]
fn space_right_and_down_go_forward() {
    for key in [" ", "ArrowRight", "ArrowDown"] {
        assert_eq!(NavKey::from_key(key), Some(NavKey::Next), "{key:?}");
    }
}

#[test]
fn other_keys_are_ignored() {
    assert_eq!(NavKey::from_key("Enter"), None);
    assert_eq!(NavKey::from_key("a"), None);
}
