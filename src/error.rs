//! Error types for scratchio
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ScratchError
pub type Result<T> = std::result::Result<T, ScratchError>;

/// Unified error type for scratch storage operations
#[derive(Debug, Error)]
pub enum ScratchError {
    // -------------------------------------------------------------------------
    // Addressing Errors
    // -------------------------------------------------------------------------
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error on volume {volume} at offset {offset} (length {length}): {source}")]
    Io {
        volume: usize,
        offset: u64,
        length: u64,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Unit Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Unit {0} is already open")]
    AlreadyOpen(usize),

    #[error("Unit {0} is not open")]
    NotOpen(usize),

    #[error("Unit {0} already has backing files")]
    AlreadyExists(usize),

    #[error("Unit {0} has no backing files")]
    NotFound(usize),

    #[error("Unit {unit} was written with {stored} volumes, opened with {configured}")]
    VolumeMismatch {
        unit: usize,
        stored: usize,
        configured: usize,
    },

    // -------------------------------------------------------------------------
    // TOC Errors
    // -------------------------------------------------------------------------
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Read of {requested} bytes at offset {offset} overruns entry '{key}' ({length} bytes)")]
    EntryOverrun {
        key: String,
        offset: u64,
        requested: u64,
        length: u64,
    },

    #[error("Entry '{key}' of {length} bytes does not fit in memory")]
    EntryTooLarge { key: String, length: u64 },

    #[error("TOC corruption detected: {0}")]
    CorruptToc(String),

    #[error("Read of unwritten region on unit {unit}: {missing} bytes past end of data")]
    UnwrittenRegion { unit: usize, missing: u64 },

    // -------------------------------------------------------------------------
    // Registry Errors
    // -------------------------------------------------------------------------
    #[error("Invalid unit id {id} (max {max})")]
    InvalidUnitId { id: usize, max: usize },

    #[error("Registry is not initialized")]
    NotInitialized,

    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScratchError {
    /// Build a closure that wraps an `std::io::Error` with volume context.
    ///
    /// Intended for `map_err` at every physical I/O site.
    pub fn io(volume: usize, offset: u64, length: u64) -> impl FnOnce(std::io::Error) -> Self {
        move |source| ScratchError::Io {
            volume,
            offset,
            length,
            source,
        }
    }

    /// Whether this error means the scratch store itself is unusable.
    ///
    /// The library never terminates the process; embedding applications decide
    /// whether a fatal error escalates to an exit with the configured code.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScratchError::AllocationFailure(_))
    }
}
