#![forbid(unsafe_code)]

//! Per-buffer undo/redo journal.
//!
//! Every edit applied to a buffer is reported to its [`EntryLog`], which
//! journals it as an [`UndoEntry`]. Undo reverts the entry before the
//! cursor, redo reapplies the entry at it, and recording after an undo
//! discards the redo tail.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           EntryLog                                │
//! │                                                                   │
//! │   record(kind, loc, text, now)                                    │
//! │        │                                                          │
//! │        ├─ truncate redo tail                                      │
//! │        ├─ group open?  ──► append edit to the group's entry       │
//! │        ├─ coalesce?    ──► extend tail (typing, backspace runs)   │
//! │        └─ else         ──► new entry (grow, or evict oldest)      │
//! │                                                                   │
//! │   [ e1 | e2 | e3 | e4 ]          undo(store) ◄─┐                  │
//! │                 ▲ position                     ├── ReplayGuard    │
//! │                                  redo(store) ◄─┘                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Structure
//!
//! - [`entry`]: `UndoEntry`, `Edit` and their replay against a store
//! - [`coalesce`]: when consecutive edits fold into one entry
//! - [`group`]: explicit group brackets and the coalescing window
//! - [`log`]: the journal itself, capacity and save points
//! - [`replay`]: undo and redo
//! - `persist` (feature `state-persistence`): journal files
//!
//! # Merge Strategy
//!
//! - Typing "hello" creates 5 insert records
//! - Merged, they become 1 entry that inserts "hello"
//! - Undo removes "hello" in one step
//!
//! Merge decisions use a 400ms window, position adjacency, deletion
//! direction and word boundaries. Explicit groups override all of them.

pub mod coalesce;
pub mod entry;
pub mod error;
pub mod group;
pub mod log;
#[cfg(feature = "state-persistence")]
pub mod persist;
pub mod replay;

pub use coalesce::{
    DEFAULT_MAX_ENTRY_BYTES, DEFAULT_WINDOW_MS, MergeConfig, MergeRefusal, should_merge,
};
pub use entry::{BASE_VERSION, DeleteDirection, Edit, EditKind, GroupId, UndoEntry, VersionId};
pub use error::UndoError;
pub use group::{GroupEnd, GroupState, LastEdit};
pub use log::{
    DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_ENTRIES, EntryLog, FALLBACK_CAPACITY, LogConfig, RecordStatus,
};
#[cfg(feature = "state-persistence")]
pub use persist::{PersistError, content_digest, load_log, save_log};
