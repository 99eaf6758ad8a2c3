#![forbid(unsafe_code)]

//! Quill Runtime
//!
//! This crate provides the editing runtime that sits between the text
//! store in `quill-text` and the screen: per-buffer undo history, edit
//! transactions and deferred resize handling.
//!
//! # Key Components
//!
//! - [`Buffer`] - text store plus undo journal plus transaction depth
//! - [`undo::EntryLog`] - linear undo/redo journal with coalescing
//! - [`commands`] - `undo_cmd` / `redo_cmd` with repeat counts
//! - [`transaction`] - display-publish brackets (`edit_begin`/`edit_commit`)
//! - [`ResizeGate`] - window-change flag honored only between transactions
//! - [`UndoPolicy`] - undo tuning loadable from TOML/JSON
//!
//! # Example
//!
//! ```
//! use quill_runtime::{Buffer, ScreenFlags, commands::undo_cmd};
//! use quill_text::Location;
//!
//! let mut buf = Buffer::new("notes.txt");
//! buf.insert(Location::ORIGIN, "hello").unwrap();
//! assert!(buf.is_modified());
//!
//! let mut screen = ScreenFlags::default();
//! let report = undo_cmd(&mut buf, 1, &mut screen);
//! assert_eq!(report.applied, 1);
//! assert_eq!(buf.contents(), "");
//! assert!(!buf.is_modified());
//! ```

pub mod buffer;
pub mod clock;
pub mod commands;
pub mod policy_config;
pub mod resize;
pub mod transaction;
pub mod undo;

pub use buffer::Buffer;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use commands::{CommandReport, HistoryDirection, redo_cmd, undo_cmd};
pub use policy_config::{MAX_INITIAL_CAPACITY, PolicyConfigError, UndoPolicy};
pub use resize::ResizeGate;
pub use transaction::{DepthProbe, EditDepth, EditScope, Publisher, ScreenFlags};
pub use undo::{EditKind, EntryLog, LogConfig, MergeConfig, RecordStatus, UndoEntry, UndoError};
