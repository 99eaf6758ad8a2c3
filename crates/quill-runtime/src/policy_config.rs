#![forbid(unsafe_code)]

//! Policy-as-data configuration for undo history.
//!
//! Captures the tunable parameters of the undo journal as a single
//! [`UndoPolicy`] that can be loaded from TOML or JSON at startup.
//!
//! # Loading
//!
//! ```toml
//! # quill-undo.toml
//! max_entries = 10000
//! coalesce_window_ms = 250
//! ```
//!
//! ```rust,ignore
//! let policy = UndoPolicy::from_toml_file("quill-undo.toml")?;
//! let policy = UndoPolicy::from_json_str(json)?;
//! let buffer = Buffer::new("notes").with_config(policy.to_log_config());
//! ```
//!
//! # Defaults
//!
//! Every field defaults to the value the journal uses on its own, so
//! `UndoPolicy::default().to_log_config()` equals `LogConfig::default()`.

#[cfg(feature = "policy-config")]
use std::path::Path;

#[cfg(feature = "policy-config")]
use serde::{Deserialize, Serialize};

use crate::undo::{
    DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_ENTRY_BYTES, DEFAULT_WINDOW_MS,
    LogConfig, MergeConfig,
};

/// Largest `initial_capacity` a policy may ask for. Larger histories are
/// reached by growth, not reserved up front.
pub const MAX_INITIAL_CAPACITY: usize = 1 << 20;

// ---------------------------------------------------------------------------
// UndoPolicy
// ---------------------------------------------------------------------------

/// Tunable undo parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct UndoPolicy {
    /// Entries reserved when a buffer is created.
    pub initial_capacity: usize,
    /// Hard ceiling on retained entries per buffer.
    pub max_entries: usize,
    /// Largest payload one entry may hold through coalescing.
    pub max_entry_bytes: usize,
    /// Coalescing window in milliseconds.
    pub coalesce_window_ms: u64,
    /// Let whitespace extend the preceding word's entry.
    pub merge_across_words: bool,
}

impl Default for UndoPolicy {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            coalesce_window_ms: DEFAULT_WINDOW_MS,
            merge_across_words: false,
        }
    }
}

impl UndoPolicy {
    /// Parse a policy from TOML text. Missing keys keep their defaults.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyConfigError> {
        toml::from_str(s).map_err(PolicyConfigError::Toml)
    }

    /// Read and parse a TOML policy file.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PolicyConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Parse a policy from JSON text. Missing keys keep their defaults.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, PolicyConfigError> {
        serde_json::from_str(s).map_err(PolicyConfigError::Json)
    }

    /// Read and parse a JSON policy file.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PolicyConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Every problem with this policy, one message each. Empty when the
    /// journal can run with it.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.initial_capacity == 0 {
            errors.push("initial_capacity must be > 0".into());
        }
        if self.max_entries == 0 {
            errors.push("max_entries must be > 0".into());
        }
        if self.initial_capacity > MAX_INITIAL_CAPACITY {
            errors.push(format!(
                "initial_capacity ({}) must not exceed {MAX_INITIAL_CAPACITY}",
                self.initial_capacity
            ));
        }
        if self.initial_capacity > self.max_entries {
            errors.push(format!(
                "initial_capacity ({}) must not exceed max_entries ({})",
                self.initial_capacity, self.max_entries
            ));
        }
        if self.max_entry_bytes == 0 {
            errors.push("max_entry_bytes must be > 0".into());
        }
        if self.coalesce_window_ms == 0 {
            errors.push("coalesce_window_ms must be > 0".into());
        }

        errors
    }

    /// Validate, returning the policy or every problem found.
    pub fn validated(self) -> Result<Self, PolicyConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(PolicyConfigError::Validation(errors))
        }
    }

    /// Journal configuration for new buffers.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig::new(self.initial_capacity, self.max_entries).with_merge_config(
            MergeConfig::new(self.coalesce_window_ms)
                .with_max_entry_bytes(self.max_entry_bytes)
                .with_merge_across_words(self.merge_across_words),
        )
    }

    /// One-line JSON summary for logs.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        format!(
            r#"{{"schema":"undo-policy-v1","initial_capacity":{},"max_entries":{},"max_entry_bytes":{},"coalesce_window_ms":{},"merge_across_words":{}}}"#,
            self.initial_capacity,
            self.max_entries,
            self.max_entry_bytes,
            self.coalesce_window_ms,
            self.merge_across_words,
        )
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading an undo policy.
#[derive(Debug)]
pub enum PolicyConfigError {
    /// The policy file could not be read.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "policy-config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "policy-config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for PolicyConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => write!(f, "undo policy TOML: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => write!(f, "undo policy JSON: {e}"),
            Self::Validation(errors) => {
                write!(f, "invalid undo policy: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for PolicyConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
