#![forbid(unsafe_code)]

//! User-facing undo and redo commands.
//!
//! Each command repeats its step `repeat` times (zero counts as one) inside
//! a single display-publish bracket, so a repeated undo redraws once. The
//! returned [`CommandReport`] carries the status-line message and the
//! location the editing cursor should move to.

use std::fmt;

use quill_text::{Location, TextStore};

use crate::buffer::Buffer;
use crate::transaction::Publisher;
use crate::undo::UndoError;

/// Which way a history command walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryDirection {
    Undo,
    Redo,
}

impl HistoryDirection {
    const fn verb(self) -> &'static str {
        match self {
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

/// Outcome of an undo or redo command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    /// Command that ran.
    pub direction: HistoryDirection,
    /// Steps asked for, after treating zero as one.
    pub requested: usize,
    /// Steps actually taken.
    pub applied: usize,
    /// History ran out before `requested` steps.
    pub exhausted: bool,
    /// Replay error that stopped the command, if any.
    pub failure: Option<UndoError>,
    /// Where the cursor belongs after the last step taken; `None` when no
    /// step was taken.
    pub cursor: Option<Location>,
}

impl CommandReport {
    /// Whether every requested step was taken.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.exhausted && self.failure.is_none()
    }

    /// Status-line message, if the command has something to say.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        if let Some(err) = &self.failure {
            return Some(format!("{} failed: {err}", capitalize(self.direction.verb())));
        }
        if self.exhausted {
            return Some(format!("Nothing to {}.", self.direction.verb()));
        }
        None
    }
}

impl fmt::Display for CommandReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => f.write_str(&msg),
            None => write!(f, "{} x{}", self.direction.verb(), self.applied),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Undo up to `repeat` entries.
pub fn undo_cmd<S: TextStore>(
    buffer: &mut Buffer<S>,
    repeat: usize,
    publisher: &mut dyn Publisher,
) -> CommandReport {
    run(buffer, HistoryDirection::Undo, repeat, publisher)
}

/// Redo up to `repeat` entries.
pub fn redo_cmd<S: TextStore>(
    buffer: &mut Buffer<S>,
    repeat: usize,
    publisher: &mut dyn Publisher,
) -> CommandReport {
    run(buffer, HistoryDirection::Redo, repeat, publisher)
}

fn run<S: TextStore>(
    buffer: &mut Buffer<S>,
    direction: HistoryDirection,
    repeat: usize,
    publisher: &mut dyn Publisher,
) -> CommandReport {
    let requested = repeat.max(1);
    let mut report = CommandReport {
        direction,
        requested,
        applied: 0,
        exhausted: false,
        failure: None,
        cursor: None,
    };

    let scope = buffer.edit_scope(publisher);
    for _ in 0..requested {
        let step = match direction {
            HistoryDirection::Undo => buffer.undo_step(),
            HistoryDirection::Redo => buffer.redo_step(),
        };
        match step {
            Ok(Some(cursor)) => {
                report.applied += 1;
                report.cursor = Some(cursor);
            }
            Ok(None) => {
                report.exhausted = true;
                break;
            }
            Err(err) => {
                report.failure = Some(err);
                break;
            }
        }
    }
    scope.commit();

    tracing::debug!(
        target: "quill.undo",
        command = direction.verb(),
        requested,
        applied = report.applied,
        exhausted = report.exhausted,
        failed = report.failure.is_some(),
        cursor = ?report.cursor,
        "history command"
    );
    report
}
