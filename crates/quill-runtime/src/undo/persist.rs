#![forbid(unsafe_code)]

//! Saving and restoring an undo journal alongside its file.
//!
//! The journal is only meaningful against the exact text it was recorded
//! on, so the file carries an FNV-1a digest of that text. Loading checks
//! the digest against the buffer's current contents and refuses to touch
//! the log on any mismatch.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "saved_at_ms": 1760600000000,
//!   "content_digest": "9f3c0a81d2e4b657",
//!   "content_len": 42,
//!   "position": 2,
//!   "base_version": 0,
//!   "next_version": 5,
//!   "saved_version": 4,
//!   "entries": [
//!     { "version_id": 2, "timestamp_ms": 0, "group_id": null,
//!       "is_save_point": false, "mergeable": true,
//!       "edits": [ { "kind": "insert", "line": 0, "offset": 0,
//!                    "payload": "hello", "direction": null } ] }
//!   ]
//! }
//! ```
//!
//! # Atomic Writes
//!
//! Writes use a temp-file-then-rename pattern to prevent corruption on crash.

use std::fmt;
use std::io;
use std::path::Path;

use quill_text::Location;
use serde::{Deserialize, Serialize};

use super::entry::{DeleteDirection, Edit, EditKind, UndoEntry, VersionId};
use super::log::EntryLog;

/// Current file format version.
const FORMAT_VERSION: u64 = 1;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Errors from saving or loading a journal.
#[derive(Debug)]
pub enum PersistError {
    /// Reading or writing the file failed.
    Io(io::Error),
    /// The file is not valid journal JSON.
    Json(serde_json::Error),
    /// The file was written by an incompatible format version.
    UnsupportedVersion(u64),
    /// The journal was recorded against different text.
    DigestMismatch { expected: String, actual: String },
    /// The file parsed but describes an impossible journal.
    Corrupt(String),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::UnsupportedVersion(v) => write!(
                f,
                "unsupported undo journal version: {v} (expected {FORMAT_VERSION})"
            ),
            Self::DigestMismatch { expected, actual } => write!(
                f,
                "undo journal belongs to different text (digest {expected}, buffer {actual})"
            ),
            Self::Corrupt(msg) => write!(f, "corrupt undo journal: {msg}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KindRecord {
    Insert,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DirectionRecord {
    Backward,
    Forward,
}

#[derive(Debug, Serialize, Deserialize)]
struct EditRecord {
    kind: KindRecord,
    line: usize,
    offset: usize,
    payload: String,
    direction: Option<DirectionRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    version_id: VersionId,
    timestamp_ms: u64,
    group_id: Option<u64>,
    is_save_point: bool,
    mergeable: bool,
    edits: Vec<EditRecord>,
}

/// On-disk representation of a journal.
#[derive(Debug, Serialize, Deserialize)]
struct JournalFile {
    version: u64,
    saved_at_ms: u64,
    content_digest: String,
    content_len: usize,
    position: usize,
    base_version: VersionId,
    next_version: VersionId,
    saved_version: VersionId,
    entries: Vec<EntryRecord>,
}

/// FNV-1a digest of `text`, as 16 hex digits.
#[must_use]
pub fn content_digest(text: &str) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in text.as_bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("{hash:016x}")
}

/// Save `log` to `path`, recorded against `contents`.
///
/// Uses atomic write (write-to-temp-then-rename). The parent directory must
/// already exist.
pub fn save_log(
    log: &EntryLog,
    contents: &str,
    saved_version: VersionId,
    path: &Path,
) -> Result<(), PersistError> {
    let file = JournalFile {
        version: FORMAT_VERSION,
        saved_at_ms: now_ms(),
        content_digest: content_digest(contents),
        content_len: contents.len(),
        position: log.position(),
        base_version: log.base_version(),
        next_version: log.next_version,
        saved_version,
        entries: log.entries().map(entry_record).collect(),
    };

    let json = serde_json::to_string_pretty(&file).map_err(PersistError::Json)?;

    let temp = path.with_extension("undo.tmp");
    std::fs::write(&temp, json)?;
    std::fs::rename(&temp, path)?;

    tracing::debug!(
        target: "quill.undo",
        path = %path.display(),
        entries = file.entries.len(),
        "undo journal saved"
    );
    Ok(())
}

/// Load a journal from `path` into `log`, checking it against `contents`.
///
/// - **Missing file** returns `Ok(None)` and leaves `log` alone.
/// - **Digest mismatch**, **corrupt file** or **version mismatch** return an
///   error and leave `log` alone.
/// - On success the log is replaced and the saved version is returned.
pub fn load_log(
    log: &mut EntryLog,
    contents: &str,
    path: &Path,
) -> Result<Option<VersionId>, PersistError> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    let file: JournalFile = serde_json::from_str(&raw).map_err(PersistError::Json)?;

    if file.version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion(file.version));
    }

    let actual = content_digest(contents);
    if file.content_digest != actual || file.content_len != contents.len() {
        tracing::warn!(
            target: "quill.undo",
            path = %path.display(),
            "undo journal does not match buffer contents; ignored"
        );
        return Err(PersistError::DigestMismatch {
            expected: file.content_digest,
            actual,
        });
    }

    let entries = validate(&file)?;
    let count = entries.len();
    log.restore(entries, file.position, file.base_version, file.next_version);

    tracing::debug!(
        target: "quill.undo",
        path = %path.display(),
        entries = count,
        position = log.position(),
        "undo journal loaded"
    );
    Ok(Some(file.saved_version))
}

fn entry_record(entry: &UndoEntry) -> EntryRecord {
    EntryRecord {
        version_id: entry.version_id(),
        timestamp_ms: entry.timestamp_ms(),
        group_id: entry.group_id(),
        is_save_point: entry.is_save_point(),
        mergeable: entry.is_mergeable(),
        edits: entry
            .edits()
            .iter()
            .map(|edit| EditRecord {
                kind: match edit.kind() {
                    EditKind::Delete => KindRecord::Delete,
                    _ => KindRecord::Insert,
                },
                line: edit.location().line,
                offset: edit.location().offset,
                payload: edit.payload().to_owned(),
                direction: edit.direction().map(|d| match d {
                    DeleteDirection::Backward => DirectionRecord::Backward,
                    DeleteDirection::Forward => DirectionRecord::Forward,
                }),
            })
            .collect(),
    }
}

fn validate(file: &JournalFile) -> Result<Vec<UndoEntry>, PersistError> {
    if file.position > file.entries.len() {
        return Err(PersistError::Corrupt(format!(
            "position {} past {} entries",
            file.position,
            file.entries.len()
        )));
    }

    let mut previous = file.base_version;
    let mut entries = Vec::with_capacity(file.entries.len());
    for (index, record) in file.entries.iter().enumerate() {
        if record.version_id <= previous || record.version_id >= file.next_version {
            return Err(PersistError::Corrupt(format!(
                "entry {index} has out-of-order version {}",
                record.version_id
            )));
        }
        previous = record.version_id;

        let mut edits = record.edits.iter().map(|edit| {
            let kind = match edit.kind {
                KindRecord::Insert => EditKind::Insert,
                KindRecord::Delete => EditKind::Delete,
            };
            let direction = edit.direction.map(|d| match d {
                DirectionRecord::Backward => DeleteDirection::Backward,
                DirectionRecord::Forward => DeleteDirection::Forward,
            });
            Edit::new(kind, Location::new(edit.line, edit.offset), edit.payload.as_str())
                .with_direction(direction)
        });
        let Some(first) = edits.next() else {
            return Err(PersistError::Corrupt(format!("entry {index} has no edits")));
        };
        let mut entry = UndoEntry::new(first, record.timestamp_ms, record.group_id, record.version_id);
        entry.edits.extend(edits);
        entry.is_save_point = record.is_save_point;
        entry.mergeable = record.mergeable;
        entries.push(entry);
    }
    Ok(entries)
}

fn now_ms() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::SystemTime::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================
