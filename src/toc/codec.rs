//! TOC codec
//!
//! Encoding for the TOC image and the fixed trailer that locates it.
//!
//! ## Tail Layout
//! ```text
//! ... data pages ... │ TOC image (toc_len) │ Trailer (40) │ <- logical end
//! ```
//!
//! ### TOC image (bincode, fixed-width little endian)
//! ```text
//! ┌────────────┬──────────────────────────────────────────────────────────┐
//! │ Count (8)  │ [KeyLen (8)][Key][SPage (8)][SOff (8)][EPage (8)][EOff (8)][Len (8)] ... │
//! └────────────┴──────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Trailer
//! ```text
//! ┌──────────┬───────────┬───────────┬──────────┬──────────┬───────────┬─────────┬──────────┐
//! │Magic (4) │Version (2)│Volumes (2)│EndPage(8)│EndOff (8)│TocLen (8) │ CRC (4) │ Rsvd (4) │
//! └──────────┴───────────┴───────────┴──────────┴──────────┴───────────┴─────────┴──────────┘
//! ```

use bincode::Options;
use bytes::{Buf, BufMut, BytesMut};

use crate::address::Address;
use crate::error::{Result, ScratchError};

use super::{Toc, TocEntry};

/// Magic bytes identifying a scratch unit trailer
pub const MAGIC: &[u8; 4] = b"SCRT";

/// Current on-disk format version
pub const FORMAT_VERSION: u16 = 1;

/// Trailer size: 4 + 2 + 2 + 8 + 8 + 8 + 4 + 4 = 40 bytes
pub const TRAILER_SIZE: u64 = 40;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

/// Encode the TOC as a length-prefixed entry sequence
pub fn serialize(toc: &Toc) -> Result<Vec<u8>> {
    options()
        .serialize(toc.entries())
        .map_err(|e| ScratchError::CorruptToc(format!("failed to encode TOC: {}", e)))
}

/// Decode a TOC image produced by [`serialize`]
///
/// Every entry is validated and keys must be unique.
pub fn deserialize(bytes: &[u8]) -> Result<Toc> {
    let entries: Vec<TocEntry> = options()
        .with_limit(bytes.len() as u64)
        .reject_trailing_bytes()
        .deserialize(bytes)
        .map_err(|e| ScratchError::CorruptToc(format!("failed to decode TOC: {}", e)))?;
    Toc::from_entries(entries)
}

/// Fixed-size record at the logical end of a closed unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// Volume count the unit was striped over
    pub volumes: u16,
    /// Where the TOC image starts (end of record data)
    pub data_end: Address,
    /// Size of the TOC image in bytes
    pub toc_len: u64,
    /// CRC32 of the TOC image
    pub toc_crc: u32,
}

impl Trailer {
    /// Describe `image` stored at `data_end`
    pub fn for_image(image: &[u8], data_end: Address, volumes: u16) -> Self {
        Self {
            volumes,
            data_end,
            toc_len: image.len() as u64,
            toc_crc: crc32fast::hash(image),
        }
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(TRAILER_SIZE as usize);
        buf.put_slice(MAGIC);
        buf.put_u16_le(FORMAT_VERSION);
        buf.put_u16_le(self.volumes);
        buf.put_u64_le(self.data_end.page());
        buf.put_u64_le(self.data_end.offset());
        buf.put_u64_le(self.toc_len);
        buf.put_u32_le(self.toc_crc);
        buf.put_u32_le(0);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != TRAILER_SIZE as usize {
            return Err(ScratchError::CorruptToc(format!(
                "trailer is {} bytes, expected {}",
                bytes.len(),
                TRAILER_SIZE
            )));
        }

        let mut buf = bytes;
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(ScratchError::CorruptToc(format!(
                "invalid trailer magic: expected SCRT, got {:?}",
                magic
            )));
        }

        let version = buf.get_u16_le();
        if version != FORMAT_VERSION {
            return Err(ScratchError::CorruptToc(format!(
                "unsupported format version: {}",
                version
            )));
        }

        let volumes = buf.get_u16_le();
        let page = buf.get_u64_le();
        let offset = buf.get_u64_le();
        let data_end = Address::new(page, offset)
            .map_err(|e| ScratchError::CorruptToc(e.to_string()))?;
        let toc_len = buf.get_u64_le();
        let toc_crc = buf.get_u32_le();

        Ok(Self {
            volumes,
            data_end,
            toc_len,
            toc_crc,
        })
    }

    /// Check `image` against the recorded length and CRC
    pub fn verify(&self, image: &[u8]) -> Result<()> {
        if image.len() as u64 != self.toc_len {
            return Err(ScratchError::CorruptToc(format!(
                "TOC image is {} bytes, trailer records {}",
                image.len(),
                self.toc_len
            )));
        }
        let crc = crc32fast::hash(image);
        if crc != self.toc_crc {
            return Err(ScratchError::CorruptToc(format!(
                "TOC CRC mismatch: expected {:08x}, got {:08x}",
                self.toc_crc, crc
            )));
        }
        Ok(())
    }

    /// Logical position one past the trailer
    pub fn logical_end(&self) -> u128 {
        self.data_end.to_logical() + self.toc_len as u128 + TRAILER_SIZE as u128
    }
}
