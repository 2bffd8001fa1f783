#![allow(clippy::float_cmp)]

use time::OffsetDateTime;

use super::*;
use crate::Size;

fn page(n: i64) -> PageNumber {
    PageNumber::new(n).expect("page")
}

fn draw(page_no: i64, tag: f64) -> Command {
    let stroke = Stroke::from_coords(page(page_no), &[tag, tag, tag + 1.0, tag + 1.0], "#ADFF2F", 10.0, Size::new(800.0, 600.0))
        .expect("stroke");
    Command::DrawStroke(stroke)
}

fn goto(page_no: i64) -> Command {
    Command::goto_page(page_no).expect("goto")
}

fn clear(page_no: i64) -> Command {
    Command::clear_page(page_no).expect("clear")
}

fn end_at(secs: i64) -> Command {
    Command::EndSession { timestamp: OffsetDateTime::from_unix_timestamp(secs).expect("ts") }
}

fn replay(log: &CommandLog, page_no: i64) -> Vec<Command> {
    log.commands_for_page(page(page_no)).cloned().collect()
}

// =============================================================================
// commands_for_page
// =============================================================================

#[test]
fn clear_drops_earlier_marks_on_same_page() {
    let log = CommandLog::from_snapshot([draw(1, 1.0), clear(1), draw(1, 2.0)]).expect("log");
    assert_eq!(replay(&log, 1), vec![draw(1, 2.0)]);
}

#[test]
fn replay_without_clear_starts_at_beginning() {
    let log = CommandLog::from_snapshot([draw(1, 1.0), draw(2, 5.0), draw(1, 2.0)]).expect("log");
    assert_eq!(replay(&log, 1), vec![draw(1, 1.0), draw(1, 2.0)]);
}

#[test]
fn replay_uses_most_recent_clear_only() {
    let log = CommandLog::from_snapshot([draw(1, 1.0), clear(1), draw(1, 2.0), clear(1), draw(1, 3.0), draw(1, 4.0)])
        .expect("log");
    assert_eq!(replay(&log, 1), vec![draw(1, 3.0), draw(1, 4.0)]);
}

#[test]
fn clear_on_other_page_does_not_affect_page() {
    let log = CommandLog::from_snapshot([draw(1, 1.0), clear(2), draw(1, 2.0), draw(2, 9.0)]).expect("log");
    assert_eq!(replay(&log, 1), vec![draw(1, 1.0), draw(1, 2.0)]);
    assert_eq!(replay(&log, 2), vec![draw(2, 9.0)]);
}

#[test]
fn navigation_is_never_replayed() {
    let log = CommandLog::from_snapshot([draw(1, 1.0), goto(2), draw(2, 2.0), goto(1)]).expect("log");
    assert_eq!(replay(&log, 1), vec![draw(1, 1.0)]);
    assert_eq!(replay(&log, 2), vec![draw(2, 2.0)]);
}

#[test]
fn replay_is_idempotent() {
    let log = CommandLog::from_snapshot([draw(1, 1.0), clear(1), draw(1, 2.0), goto(3), draw(1, 3.0)]).expect("log");
    assert_eq!(replay(&log, 1), replay(&log, 1));
}

#[test]
fn replay_of_untouched_page_is_empty() {
    let log = CommandLog::from_snapshot([draw(1, 1.0)]).expect("log");
    assert!(log.commands_for_page(page(7)).next().is_none());
}

#[test]
fn strokes_for_page_matches_commands_for_page() {
    let log = CommandLog::from_snapshot([draw(2, 1.0), clear(2), draw(2, 4.0)]).expect("log");
    let strokes: Vec<&Stroke> = log.strokes_for_page(page(2)).collect();
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].points()[0].x, 4.0);
}

// =============================================================================
// append / termination
// =============================================================================

#[test]
fn append_after_end_is_rejected() {
    let mut log = CommandLog::new();
    assert_eq!(log.append(draw(1, 1.0)), Ok(Appended::Stored));
    assert_eq!(log.append(end_at(100)), Ok(Appended::Stored));

    let err = log.append(draw(1, 2.0)).expect_err("closed");
    assert!(matches!(err, LogError::SessionEnded(_)));
    assert_eq!(log.len(), 2);
}

#[test]
fn second_end_session_is_absorbed() {
    let mut log = CommandLog::new();
    log.append(end_at(100)).expect("first end");
    let first = log.ended_at();

    assert_eq!(log.append(end_at(200)), Ok(Appended::DuplicateEnd));
    assert_eq!(log.ended_at(), first);
    assert_eq!(log.len(), 1);
}

#[test]
fn snapshot_preserves_arrival_order() {
    let commands = vec![draw(1, 1.0), goto(2), clear(2), draw(2, 3.0), end_at(5)];
    let log = CommandLog::from_snapshot(commands.clone()).expect("log");
    assert_eq!(log.snapshot(), commands);
    assert!(log.is_closed());
}

#[test]
fn from_snapshot_rejects_commands_after_end() {
    let err = CommandLog::from_snapshot([end_at(5), draw(1, 1.0)]).expect_err("after end");
    assert!(matches!(err, LogError::SessionEnded(_)));
}

#[test]
fn last_visited_page_tracks_latest_goto() {
    let mut log = CommandLog::new();
    assert_eq!(log.last_visited_page(), None);
    log.append(goto(4)).expect("goto");
    log.append(draw(4, 1.0)).expect("draw");
    log.append(goto(2)).expect("goto");
    assert_eq!(log.last_visited_page(), Some(page(2)));
}
