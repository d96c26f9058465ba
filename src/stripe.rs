//! Read/Write Engine
//!
//! Maps logical `(address, length)` requests onto physical volume I/O.
//!
//! ## Striping
//! ```text
//! logical pages:   0    1    2    3    4    5   ...
//! numvols = 3:    v0   v1   v2   v0   v1   v2
//! local page:      0    0    0    1    1    1
//! ```
//! Page `p` lives on volume `p % numvols` at physical offset
//! `(p / numvols) * PAGE_SIZE + offset`. Requests are split at page boundaries
//! and issued in increasing logical order.

use tracing::trace;

use crate::address::{Address, PAGE_SIZE};
use crate::config::UnwrittenReadPolicy;
use crate::error::{Result, ScratchError};
use crate::volume::Volume;

/// One physical piece of a logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Volume index within the unit
    pub volume: usize,
    /// Byte offset within the volume file
    pub physical_offset: u64,
    /// Byte offset within the caller's buffer
    pub buffer_offset: usize,
    /// Number of bytes
    pub len: usize,
}

/// Round-robin page layout over a fixed number of volumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stripe {
    volumes: usize,
}

impl Stripe {
    pub fn new(volumes: usize) -> Result<Self> {
        if volumes == 0 {
            return Err(ScratchError::Config(
                "a unit needs at least one volume".to_string(),
            ));
        }
        Ok(Self { volumes })
    }

    pub fn volumes(&self) -> usize {
        self.volumes
    }

    /// Volume index and physical offset holding the byte at `addr`
    pub fn locate(&self, addr: Address) -> Result<(usize, u64)> {
        let n = self.volumes as u64;
        let volume = (addr.page() % n) as usize;
        let physical = (addr.page() / n)
            .checked_mul(PAGE_SIZE)
            .and_then(|base| base.checked_add(addr.offset()))
            .ok_or_else(|| {
                ScratchError::InvalidAddress(format!(
                    "address {} is beyond the physical range of a volume",
                    addr
                ))
            })?;
        Ok((volume, physical))
    }

    /// Split `len` bytes starting at `start` into per-volume chunks
    ///
    /// Adjacent pages that land contiguously on the same volume (always the
    /// case with one volume) are merged into a single chunk.
    pub fn plan(&self, start: Address, len: usize) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut addr = start;
        let mut done = 0usize;

        while done < len {
            let take = (len - done).min(addr.page_remaining() as usize);
            let (volume, physical_offset) = self.locate(addr)?;

            match chunks.last_mut() {
                Some(last)
                    if last.volume == volume
                        && last.physical_offset + last.len as u64 == physical_offset =>
                {
                    last.len += take;
                }
                _ => chunks.push(Chunk {
                    volume,
                    physical_offset,
                    buffer_offset: done,
                    len: take,
                }),
            }

            done += take;
            if done < len {
                addr = addr.advance(take as u64)?;
            }
        }

        Ok(chunks)
    }

    /// Logical size of a unit whose volume files have the given lengths
    pub fn logical_len(&self, volume_lens: &[u64]) -> u128 {
        let n = self.volumes as u128;
        let page = PAGE_SIZE as u128;
        volume_lens
            .iter()
            .enumerate()
            .filter(|(_, &len)| len > 0)
            .map(|(v, &len)| {
                let last = len as u128 - 1;
                let global_page = (last / page) * n + v as u128;
                global_page * page + last % page + 1
            })
            .max()
            .unwrap_or(0)
    }

    /// Bytes volume `volume` holds for a unit whose logical size is `logical_end`
    pub fn volume_len(&self, logical_end: u128, volume: usize) -> u128 {
        let n = self.volumes as u128;
        let page = PAGE_SIZE as u128;
        let v = volume as u128;
        let full_pages = logical_end / page;
        let rem = logical_end % page;

        let mut pages = full_pages / n;
        if v < full_pages % n {
            pages += 1;
        }
        let mut len = pages * page;
        if rem > 0 && full_pages % n == v {
            len += rem;
        }
        len
    }
}

/// Write `data` at `start` across `volumes`, returning the end address
pub fn write(volumes: &mut [Volume], stripe: &Stripe, start: Address, data: &[u8]) -> Result<Address> {
    for chunk in stripe.plan(start, data.len())? {
        let bytes = &data[chunk.buffer_offset..chunk.buffer_offset + chunk.len];
        volume_mut(volumes, chunk.volume)?.write_at(chunk.physical_offset, bytes)?;
    }
    trace!(start = %start, len = data.len(), "striped write");
    start.advance(data.len() as u64)
}

/// Fill `buf` from `start` across `volumes`
///
/// Bytes no volume file holds yet are zero-filled, or rejected with
/// `UnwrittenRegion` under the strict policy. Returns the number of bytes that
/// were backed by file data.
pub fn read(
    volumes: &mut [Volume],
    stripe: &Stripe,
    start: Address,
    buf: &mut [u8],
    policy: UnwrittenReadPolicy,
    unit: usize,
) -> Result<usize> {
    let mut backed = 0usize;
    let mut missing = 0u64;

    for chunk in stripe.plan(start, buf.len())? {
        let piece = &mut buf[chunk.buffer_offset..chunk.buffer_offset + chunk.len];
        let filled = volume_mut(volumes, chunk.volume)?.read_at(chunk.physical_offset, piece)?;
        piece[filled..].fill(0);
        backed += filled;
        missing += (chunk.len - filled) as u64;
    }

    if missing > 0 && policy == UnwrittenReadPolicy::Error {
        return Err(ScratchError::UnwrittenRegion { unit, missing });
    }

    trace!(start = %start, len = buf.len(), backed, "striped read");
    Ok(backed)
}

fn volume_mut(volumes: &mut [Volume], index: usize) -> Result<&mut Volume> {
    let count = volumes.len();
    volumes.get_mut(index).ok_or_else(|| {
        ScratchError::Config(format!("volume {} out of range ({} volumes)", index, count))
    })
}
