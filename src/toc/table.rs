//! Table of contents implementation
//!
//! An insertion-ordered list of entries with unique keys.

use std::fmt;

use crate::address::Address;
use crate::error::{Result, ScratchError};

use super::TocEntry;

/// Per-unit index mapping keys to byte ranges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
    /// Entries in the order their keys were first written
    entries: Vec<TocEntry>,
}

impl Toc {
    /// Create an empty TOC
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the entry stored under `key`
    pub fn lookup(&self, key: &str) -> Option<&TocEntry> {
        self.entries.iter().find(|e| e.key() == key)
    }

    /// Insert `entry`, replacing any entry with the same key in place
    ///
    /// Returns the replaced entry, if any.
    pub fn insert_or_update(&mut self, entry: TocEntry) -> Option<TocEntry> {
        match self.position(entry.key()) {
            Some(pos) => Some(std::mem::replace(&mut self.entries[pos], entry)),
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    /// Remove the entry stored under `key`
    pub fn delete(&mut self, key: &str) -> Result<TocEntry> {
        let pos = self
            .position(key)
            .ok_or_else(|| ScratchError::KeyNotFound(key.to_string()))?;
        Ok(self.entries.remove(pos))
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TocEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest end address over all entries (ZERO for an empty TOC)
    pub fn end_of_entries(&self) -> Address {
        self.entries
            .iter()
            .map(TocEntry::end)
            .max()
            .unwrap_or(Address::ZERO)
    }

    /// Total bytes held by all entries
    pub fn total_length(&self) -> u64 {
        self.entries.iter().map(TocEntry::length).sum()
    }

    /// Build a TOC from decoded entries, rejecting duplicate keys
    pub(crate) fn from_entries(entries: Vec<TocEntry>) -> Result<Self> {
        let mut toc = Toc::new();
        for entry in entries {
            entry.check()?;
            if toc.lookup(entry.key()).is_some() {
                return Err(ScratchError::CorruptToc(format!(
                    "duplicate key '{}'",
                    entry.key()
                )));
            }
            toc.entries.push(entry);
        }
        Ok(toc)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key() == key)
    }
}

impl<'a> IntoIterator for &'a Toc {
    type Item = &'a TocEntry;
    type IntoIter = std::slice::Iter<'a, TocEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for Toc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<40} {:>12} {:>8} {:>12} {:>8} {:>14}",
            "Key", "Spage", "Soffset", "Epage", "Eoffset", "Length"
        )?;
        writeln!(f, "{}", "-".repeat(99))?;
        for entry in &self.entries {
            writeln!(
                f,
                "{:<40} {:>12} {:>8} {:>12} {:>8} {:>14}",
                entry.key(),
                entry.start().page(),
                entry.start().offset(),
                entry.end().page(),
                entry.end().offset(),
                entry.length()
            )?;
        }
        Ok(())
    }
}
