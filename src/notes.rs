//! Append-only notes log
//!
//! Notes captured via "note" commands accumulate in memory for the session
//! and are appended line-by-line to `notes.txt` in the data directory.
//! Persistence is best-effort: a write failure is logged and the note is
//! still kept in memory.

use std::io::Write;
use std::path::PathBuf;

use crate::Result;

/// Session note log with optional file persistence
#[derive(Debug)]
pub struct NoteStore {
    path: Option<PathBuf>,
    notes: Vec<String>,
}

impl NoteStore {
    /// Create a store persisting to `notes.txt` under `data_dir`
    #[must_use]
    pub fn new(data_dir: &std::path::Path) -> Self {
        Self {
            path: Some(data_dir.join("notes.txt")),
            notes: Vec::new(),
        }
    }

    /// Create a memory-only store (used in tests)
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            path: None,
            notes: Vec::new(),
        }
    }

    /// Append a note; never mutated or removed afterwards
    ///
    /// # Errors
    ///
    /// Returns error if the backing file cannot be written. The note is
    /// retained in memory regardless.
    pub fn append(&mut self, text: &str) -> Result<()> {
        self.notes.push(text.to_string());

        if let Some(path) = &self.path {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            writeln!(file, "{text}")?;
            tracing::debug!(path = %path.display(), "note appended");
        }

        Ok(())
    }

    /// All notes captured this session, in order
    #[must_use]
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Number of notes captured this session
    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether any notes have been captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
