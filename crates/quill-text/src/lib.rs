#![forbid(unsafe_code)]

//! Text storage for quill buffers.
//!
//! This crate owns the byte-level half of editing: it knows how to insert,
//! delete and read text at a [`Location`], and nothing about undo. The undo
//! engine in `quill-runtime` drives a [`TextStore`] both as the source of
//! truth for captured payloads and as the target of replay.
//!
//! # Key Components
//!
//! - [`Location`] - line index plus byte offset within the line
//! - [`TextStore`] - the storage adapter trait consumed by the undo engine
//! - [`RopeStore`] - `ropey`-backed implementation
//! - [`word`] - whitespace classification for undo coalescing
//!
//! # Example
//!
//! ```
//! use quill_text::{Location, RopeStore, TextStore};
//!
//! let mut store = RopeStore::new();
//! let end = store.insert_bytes(Location::ORIGIN, "hello\nworld").unwrap();
//! assert_eq!(end, Location::new(1, 5));
//! assert_eq!(store.delete_bytes(Location::new(0, 3), 4).unwrap(), "lo\nw");
//! assert_eq!(store.contents(), "helorld");
//! ```

pub mod location;
pub mod rope;
pub mod store;
pub mod word;

pub use location::Location;
pub use rope::RopeStore;
pub use store::{TextError, TextStore};
pub use word::{ends_with_whitespace, starts_with_whitespace};
