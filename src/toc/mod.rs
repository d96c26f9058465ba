//! Table of Contents Module
//!
//! Per-unit index from symbolic keys to byte ranges.
//!
//! ## Responsibilities
//! - Key lookup, insert-or-update and delete with unique keys
//! - Binary encoding of the index for storage at the unit tail
//! - Integrity checking (trailer magic, CRC32, entry consistency) on load
//!
//! The in-memory `Toc` is authoritative while a unit is open; it is read once
//! on open and written once on close.

mod codec;
mod entry;
mod table;

pub use codec::{deserialize, serialize, Trailer, FORMAT_VERSION, MAGIC, TRAILER_SIZE};
pub use entry::{validate_key, TocEntry, MAX_KEY_LEN};
pub use table::Toc;
