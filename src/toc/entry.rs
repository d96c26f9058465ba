//! TOC Entry definitions

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{Result, ScratchError};

/// Maximum key length in bytes
pub const MAX_KEY_LEN: usize = 80;

/// One named record in a unit: its key and the byte range it occupies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    key: String,
    start: Address,
    end: Address,
    length: u64,
}

impl TocEntry {
    /// Create an entry covering `length` bytes from `start`
    pub fn new(key: impl Into<String>, start: Address, length: u64) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;
        let end = start.advance(length)?;
        Ok(Self {
            key,
            start,
            end,
            length,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Global address of byte `offset` within this entry
    pub fn address_of(&self, offset: u64) -> Result<Address> {
        self.start.advance(offset)
    }

    /// Check the stored fields agree with each other
    ///
    /// Entries built through [`TocEntry::new`] always pass; decoded entries
    /// may not.
    pub(crate) fn check(&self) -> Result<()> {
        validate_key(&self.key).map_err(|e| ScratchError::CorruptToc(e.to_string()))?;
        match self.end.distance_from(self.start) {
            Some(span) if span == self.length as u128 => Ok(()),
            _ => Err(ScratchError::CorruptToc(format!(
                "entry '{}' spans {}..{} but records length {}",
                self.key, self.start, self.end, self.length
            ))),
        }
    }
}

/// Reject empty keys and keys longer than [`MAX_KEY_LEN`]
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ScratchError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(ScratchError::InvalidKey(format!(
            "key '{}' is {} bytes (max {})",
            key,
            key.len(),
            MAX_KEY_LEN
        )));
    }
    Ok(())
}
