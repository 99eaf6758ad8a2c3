#![forbid(unsafe_code)]

//! Undo journals saved next to a file and restored in a later session.
//!
//! Run:
//!   cargo test -p quill-runtime --features state-persistence --test persistence

use std::sync::Arc;

use quill_runtime::undo::PersistError;
use quill_runtime::{Buffer, LogConfig, ManualClock};
use quill_text::Location;

fn edited_buffer(clock: &ManualClock) -> Buffer {
    let mut buf = Buffer::from_text("notes.txt", "title\n").with_clock(Arc::new(clock.clone()));
    buf.insert(Location::new(1, 0), "first line").unwrap();
    clock.advance(1000);
    buf.insert(Location::new(1, 10), "\nsecond").unwrap();
    clock.advance(1000);
    buf.delete(Location::new(0, 0), 1).unwrap();
    buf
}

#[test]
fn reopened_buffer_can_undo_previous_session() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("notes.txt.undo");
    let clock = ManualClock::new();

    let mut first = edited_buffer(&clock);
    first.mark_saved();
    first.save_history(&journal).unwrap();
    let text = first.contents();

    let mut second = Buffer::from_text("notes.txt", &text);
    assert!(second.load_history(&journal).unwrap());
    assert!(!second.is_modified());
    assert_eq!(second.log().len(), 3);

    while second.undo().unwrap() {}
    assert_eq!(second.contents(), "title\n");
    assert!(second.is_modified());

    while second.redo().unwrap() {}
    assert_eq!(second.contents(), text);
    assert!(!second.is_modified());
}

#[test]
fn journal_for_other_text_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("notes.txt.undo");
    let clock = ManualClock::new();
    edited_buffer(&clock).save_history(&journal).unwrap();

    let mut other = Buffer::from_text("notes.txt", "changed on disk");
    let err = other.load_history(&journal).unwrap_err();
    assert!(matches!(err, PersistError::DigestMismatch { .. }));
    assert!(other.log().is_empty());
    assert!(!other.is_modified());
}

#[test]
fn missing_journal_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut buf = Buffer::from_text("a", "x");
    assert!(!buf.load_history(&dir.path().join("none.undo")).unwrap());
    assert!(buf.log().is_empty());
}

#[test]
fn new_edits_after_restore_get_fresh_versions() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("notes.txt.undo");
    let clock = ManualClock::new();
    let first = edited_buffer(&clock);
    first.save_history(&journal).unwrap();

    let mut second = Buffer::from_text("notes.txt", &first.contents());
    second.load_history(&journal).unwrap();
    let restored_top = second.log().current_version();
    second.seal();
    second.insert(Location::ORIGIN, "#").unwrap();
    assert!(second.log().current_version() > restored_top);
    assert_eq!(second.log().len(), 4);
}

#[test]
fn partial_position_survives_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("notes.txt.undo");
    let clock = ManualClock::new();
    let mut first = edited_buffer(&clock);
    first.undo().unwrap();
    first.save_history(&journal).unwrap();

    let mut second = Buffer::from_text("notes.txt", &first.contents());
    second.load_history(&journal).unwrap();
    assert_eq!(second.log().position(), 2);
    assert!(second.log().can_redo());
    second.redo().unwrap();
    assert_eq!(second.contents(), "itle\nfirst line\nsecond");
}

#[test]
fn status_forms_report_success_as_bool() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("notes.txt.undo");
    let clock = ManualClock::new();
    let first = edited_buffer(&clock);
    assert!(first.save_to_file(&journal));
    assert!(!first.save_to_file(&dir.path().join("missing-dir").join("x.undo")));

    let mut second = Buffer::from_text("notes.txt", &first.contents());
    assert!(second.load_from_file(&journal));
    assert_eq!(second.log().len(), 3);

    let mut stale = Buffer::from_text("notes.txt", "stale");
    assert!(!stale.load_from_file(&journal));
    assert!(stale.log().is_empty());
}

#[test]
fn smaller_ceiling_drops_redo_tail_before_undo_history() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("n.undo");
    let clock = ManualClock::new();
    let mut first = Buffer::new("n").with_clock(Arc::new(clock.clone()));
    first.insert(Location::ORIGIN, "a").unwrap();
    clock.advance(1000);
    first.insert(Location::new(0, 1), "b").unwrap();
    while first.undo().unwrap() {}
    assert_eq!(first.contents(), "");
    first.mark_saved();
    first.save_history(&journal).unwrap();

    let mut second = Buffer::new("n").with_config(LogConfig::new(1, 1));
    assert!(second.load_history(&journal).unwrap());
    assert_eq!(second.log().len(), 1);
    assert_eq!(second.log().position(), 0);
    assert!(!second.is_modified());

    assert!(second.redo().unwrap());
    assert_eq!(second.contents(), "a");
    assert!(!second.log().can_redo());
    assert!(second.undo().unwrap());
    assert_eq!(second.contents(), "");
    assert!(!second.is_modified());
}

#[test]
fn smaller_ceiling_trims_oldest_undo_history_when_nothing_to_redo() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("notes.txt.undo");
    let clock = ManualClock::new();
    let mut first = edited_buffer(&clock);
    first.mark_saved();
    first.save_history(&journal).unwrap();

    let mut second =
        Buffer::from_text("notes.txt", &first.contents()).with_config(LogConfig::new(2, 2));
    assert!(second.load_history(&journal).unwrap());
    assert_eq!(second.log().len(), 2);
    assert_eq!(second.log().position(), 2);
    assert!(!second.is_modified());

    assert!(second.undo().unwrap());
    assert!(second.undo().unwrap());
    assert!(!second.undo().unwrap());
    assert_eq!(second.contents(), "title\nfirst line");
    assert!(second.is_modified());
}
