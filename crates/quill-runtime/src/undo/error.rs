#![forbid(unsafe_code)]

//! Errors raised while recording or replaying journal entries.

use std::fmt;

use quill_text::{Location, TextError};

use super::entry::EditKind;

/// Failure while recording or replaying an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoError {
    /// The edit kind is reserved and cannot be journaled.
    UnsupportedKind(EditKind),
    /// The text store rejected a replay step.
    Storage { at: Location, source: TextError },
    /// Bytes removed during replay did not match the journaled payload.
    StateDrift {
        at: Location,
        expected: String,
        actual: String,
    },
}

impl UndoError {
    pub(crate) fn storage(at: Location) -> impl FnOnce(TextError) -> Self {
        move |source| Self::Storage { at, source }
    }
}

impl fmt::Display for UndoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedKind(kind) => {
                write!(f, "{} edits cannot be recorded", kind.label())
            }
            Self::Storage { at, source } => write!(f, "storage error at {at}: {source}"),
            Self::StateDrift {
                at,
                expected,
                actual,
            } => write!(
                f,
                "state drift at {at}: expected {expected:?}, found {actual:?}"
            ),
        }
    }
}

impl std::error::Error for UndoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage { source, .. } => Some(source),
            _ => None,
        }
    }
}
