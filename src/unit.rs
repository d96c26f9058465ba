//! Unit
//!
//! A logical scratch file: an ordered set of volumes plus a TOC.
//!
//! ## Lifecycle
//! ```text
//!            open(status)               close(keep_data)
//!  Closed ───────────────────▶ Open ───────────────────▶ Closed
//! ```
//! On open the TOC is loaded from the unit tail (or starts empty) and the
//! volumes are cut back to the end of the data, so positions past it read as
//! unwritten. While open the in-memory TOC is authoritative. On close with `keep_data` the TOC image
//! and trailer are appended at the high-water mark and every volume is trimmed
//! to the new logical end.
//!
//! ## Space Allocation
//! New entries are placed at the high-water mark, the highest logical position
//! written by any keyed or raw write. An entry grows in place only when it is
//! the last allocated region; otherwise it moves to the high-water mark.
//! Deleted space is not reused.

use std::fs;
use std::io::ErrorKind;

use tracing::{debug, warn};

use crate::address::Address;
use crate::config::{UnitLayout, UnwrittenReadPolicy};
use crate::error::{Result, ScratchError};
use crate::stripe::{self, Stripe};
use crate::toc::{self, validate_key, Toc, TocEntry, Trailer, TRAILER_SIZE};
use crate::volume::Volume;

/// How `open` treats existing backing files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStatus {
    /// Files must not exist yet
    New,
    /// Files must already exist
    Old,
    /// Reuse files if present, create them otherwise
    OldOrNew,
}

/// I/O counters for one unit slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitStats {
    pub reads: u64,
    pub writes: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// State that only exists while the unit is open
#[derive(Debug)]
struct OpenState {
    volumes: Vec<Volume>,
    stripe: Stripe,
    toc: Toc,
    /// First byte past everything written so far
    high_water: Address,
}

/// A logical scratch file striped over one or more volumes
#[derive(Debug)]
pub struct Unit {
    id: usize,
    layout: UnitLayout,
    policy: UnwrittenReadPolicy,
    state: Option<OpenState>,
    stats: UnitStats,
}

impl Unit {
    /// Create a closed unit with the given file layout
    pub fn new(id: usize, layout: UnitLayout, policy: UnwrittenReadPolicy) -> Self {
        Self {
            id,
            layout,
            policy,
            state: None,
            stats: UnitStats::default(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open the unit's volumes and load its TOC
    pub fn open(&mut self, status: OpenStatus) -> Result<()> {
        if self.state.is_some() {
            return Err(ScratchError::AlreadyOpen(self.id));
        }

        let preexisting: Vec<bool> = self.layout.paths.iter().map(|p| p.exists()).collect();
        let existed = preexisting.contains(&true);
        match status {
            OpenStatus::New if existed => return Err(ScratchError::AlreadyExists(self.id)),
            OpenStatus::Old if !existed => return Err(ScratchError::NotFound(self.id)),
            _ => {}
        }

        let stripe = Stripe::new(self.layout.volumes())?;
        let mut volumes = Vec::with_capacity(self.layout.volumes());
        let loaded = self.open_volumes(&mut volumes).and_then(|()| {
            let (toc, high_water) = load_toc(self.id, &stripe, &mut volumes)?;
            // Drop the stored TOC and trailer; close rewrites them
            trim_volumes(&stripe, &mut volumes, high_water.to_logical())?;
            Ok((toc, high_water))
        });

        let (toc, high_water) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                // Release handles; remove only the files this call created
                for volume in &mut volumes {
                    if let Err(close_err) = volume.close(!preexisting[volume.index()]) {
                        warn!(unit = self.id, error = %close_err, "failed to release volume after open error");
                    }
                }
                return Err(e);
            }
        };

        debug!(
            unit = self.id,
            volumes = stripe.volumes(),
            entries = toc.len(),
            high_water = %high_water,
            reused = existed,
            "opened unit"
        );

        self.state = Some(OpenState {
            volumes,
            stripe,
            toc,
            high_water,
        });
        Ok(())
    }

    /// Persist the TOC (when keeping data) and release every volume
    ///
    /// The unit is closed afterwards even if an error is returned.
    pub fn close(&mut self, keep_data: bool) -> Result<()> {
        let mut state = self.state.take().ok_or(ScratchError::NotOpen(self.id))?;

        let mut first_err = if keep_data {
            store_toc(&mut state).err()
        } else {
            None
        };

        for volume in &mut state.volumes {
            if let Err(e) = volume.close(!keep_data) {
                warn!(unit = self.id, volume = volume.index(), error = %e, "volume close failed");
                first_err.get_or_insert(e);
            }
        }

        debug!(
            unit = self.id,
            keep_data,
            entries = state.toc.len(),
            "closed unit"
        );

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Delete every backing file without loading the TOC
    ///
    /// Works on units whose TOC is damaged or was never stored. The unit must
    /// be closed. Files that are already gone are skipped.
    pub fn remove_files(&mut self) -> Result<usize> {
        if self.state.is_some() {
            return Err(ScratchError::AlreadyOpen(self.id));
        }

        let mut removed = 0;
        for (index, path) in self.layout.paths.iter().enumerate() {
            match fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(ScratchError::io(index, 0, 0)(e)),
            }
        }

        debug!(unit = self.id, removed, "removed unit files");
        Ok(removed)
    }

    // =========================================================================
    // Keyed I/O
    // =========================================================================

    /// Store `data` as the full contents of `key`
    ///
    /// An existing entry is overwritten in place when the new data fits or the
    /// entry is the last allocated region; otherwise it is moved to the
    /// high-water mark.
    pub fn write(&mut self, key: &str, data: &[u8]) -> Result<()> {
        validate_key(key)?;
        let state = self.state_mut()?;
        let len = data.len() as u64;

        let start = match state.toc.lookup(key) {
            Some(e) if e.length() >= len || e.end() == state.high_water => e.start(),
            _ => state.high_water,
        };
        let entry = TocEntry::new(key, start, len)?;

        let end = stripe::write(&mut state.volumes, &state.stripe, start, data)?;
        state.toc.insert_or_update(entry);
        state.high_water = state.high_water.max(end);

        self.record_write(len);
        Ok(())
    }

    /// Write `data` at byte `offset` inside the entry for `key`
    ///
    /// Creates the entry if needed and extends it when the write runs past its
    /// current length.
    pub fn write_at(&mut self, key: &str, offset: u64, data: &[u8]) -> Result<()> {
        validate_key(key)?;
        let id = self.id;
        let state = self.state_mut()?;
        let write_end = offset.checked_add(data.len() as u64).ok_or_else(|| {
            ScratchError::InvalidAddress(format!("entry offset {} overflows", offset))
        })?;

        let entry = match state.toc.lookup(key).cloned() {
            None => TocEntry::new(key, state.high_water, write_end)?,
            Some(existing) if write_end <= existing.length() => existing,
            Some(existing) if existing.end() == state.high_water => {
                TocEntry::new(key, existing.start(), write_end)?
            }
            Some(existing) => {
                let moved = TocEntry::new(key, state.high_water, write_end)?;
                relocate(id, state, &existing, moved.start())?;
                moved
            }
        };

        let at = entry.address_of(offset)?;
        stripe::write(&mut state.volumes, &state.stripe, at, data)?;
        state.high_water = state.high_water.max(entry.end());
        state.toc.insert_or_update(entry);

        self.record_write(data.len() as u64);
        Ok(())
    }

    /// Read the full contents of `key`
    pub fn read(&mut self, key: &str) -> Result<Vec<u8>> {
        let length = self.entry_length(key)?;
        let length = usize::try_from(length).map_err(|_| ScratchError::EntryTooLarge {
            key: key.to_string(),
            length,
        })?;
        let mut buf = vec![0u8; length];
        self.read_at(key, 0, &mut buf)?;
        Ok(buf)
    }

    /// Fill `buf` from byte `offset` inside the entry for `key`
    pub fn read_at(&mut self, key: &str, offset: u64, buf: &mut [u8]) -> Result<()> {
        let (id, policy) = (self.id, self.policy);
        let state = self.state_mut()?;
        let entry = state
            .toc
            .lookup(key)
            .ok_or_else(|| ScratchError::KeyNotFound(key.to_string()))?;

        let requested = buf.len() as u64;
        if offset.checked_add(requested).map_or(true, |end| end > entry.length()) {
            return Err(ScratchError::EntryOverrun {
                key: key.to_string(),
                offset,
                requested,
                length: entry.length(),
            });
        }

        let at = entry.address_of(offset)?;
        stripe::read(&mut state.volumes, &state.stripe, at, buf, policy, id)?;

        self.record_read(requested);
        Ok(())
    }

    /// Remove `key` from the TOC; its bytes are not reclaimed
    pub fn delete_entry(&mut self, key: &str) -> Result<TocEntry> {
        let id = self.id;
        let entry = self.state_mut()?.toc.delete(key)?;
        debug!(unit = id, key, length = entry.length(), "deleted entry");
        Ok(entry)
    }

    // =========================================================================
    // Raw I/O
    // =========================================================================

    /// Write `data` at an explicit address, bypassing the TOC
    ///
    /// Returns the address one past the last byte written.
    pub fn write_raw(&mut self, addr: Address, data: &[u8]) -> Result<Address> {
        let state = self.state_mut()?;
        let end = stripe::write(&mut state.volumes, &state.stripe, addr, data)?;
        state.high_water = state.high_water.max(end);
        self.record_write(data.len() as u64);
        Ok(end)
    }

    /// Fill `buf` from an explicit address, bypassing the TOC
    pub fn read_raw(&mut self, addr: Address, buf: &mut [u8]) -> Result<()> {
        let (id, policy) = (self.id, self.policy);
        let state = self.state_mut()?;
        stripe::read(&mut state.volumes, &state.stripe, addr, buf, policy, id)?;
        self.record_read(buf.len() as u64);
        Ok(())
    }

    // =========================================================================
    // TOC Access
    // =========================================================================

    /// The in-memory TOC
    pub fn toc(&self) -> Result<&Toc> {
        Ok(&self.state_ref()?.toc)
    }

    /// Entry stored under `key`, if any
    pub fn lookup(&self, key: &str) -> Result<Option<&TocEntry>> {
        Ok(self.state_ref()?.toc.lookup(key))
    }

    /// Stored length of `key`
    pub fn entry_length(&self, key: &str) -> Result<u64> {
        self.lookup(key)?
            .map(TocEntry::length)
            .ok_or_else(|| ScratchError::KeyNotFound(key.to_string()))
    }

    /// Global address of byte `offset` inside `key`
    pub fn entry_address(&self, key: &str, offset: u64) -> Result<Address> {
        self.lookup(key)?
            .ok_or_else(|| ScratchError::KeyNotFound(key.to_string()))?
            .address_of(offset)
    }

    /// First byte past everything written to this unit
    pub fn high_water(&self) -> Result<Address> {
        Ok(self.state_ref()?.high_water)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn layout(&self) -> &UnitLayout {
        &self.layout
    }

    /// Whether any backing file is present on disk
    pub fn exists(&self) -> bool {
        self.layout.any_exists()
    }

    pub fn stats(&self) -> UnitStats {
        self.stats
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn open_volumes(&self, volumes: &mut Vec<Volume>) -> Result<()> {
        for (index, path) in self.layout.paths.iter().enumerate() {
            volumes.push(Volume::open(path, index, true)?);
        }
        Ok(())
    }

    fn state_ref(&self) -> Result<&OpenState> {
        self.state.as_ref().ok_or(ScratchError::NotOpen(self.id))
    }

    fn state_mut(&mut self) -> Result<&mut OpenState> {
        self.state.as_mut().ok_or(ScratchError::NotOpen(self.id))
    }

    fn record_write(&mut self, bytes: u64) {
        self.stats.writes += 1;
        self.stats.bytes_written += bytes;
    }

    fn record_read(&mut self, bytes: u64) {
        self.stats.reads += 1;
        self.stats.bytes_read += bytes;
    }
}

impl Drop for Unit {
    fn drop(&mut self) {
        if self.state.is_some() {
            if let Err(e) = self.close(true) {
                warn!(unit = self.id, error = %e, "failed to close unit on drop");
            }
        }
    }
}

/// Read the trailer and TOC from the tail of the striped data
fn load_toc(unit: usize, stripe: &Stripe, volumes: &mut [Volume]) -> Result<(Toc, Address)> {
    let lens = volumes.iter().map(Volume::len).collect::<Result<Vec<_>>>()?;
    let end = stripe.logical_len(&lens);
    if end == 0 {
        return Ok((Toc::new(), Address::ZERO));
    }
    if end < TRAILER_SIZE as u128 {
        return Err(ScratchError::CorruptToc(format!(
            "unit {} holds {} bytes, too small for a trailer",
            unit, end
        )));
    }

    let mut raw = [0u8; TRAILER_SIZE as usize];
    let trailer_at = Address::from_logical(end - TRAILER_SIZE as u128)?;
    stripe::read(volumes, stripe, trailer_at, &mut raw, UnwrittenReadPolicy::ZeroFill, unit)?;
    let trailer = Trailer::decode(&raw)?;

    if trailer.volumes as usize != stripe.volumes() {
        return Err(ScratchError::VolumeMismatch {
            unit,
            stored: trailer.volumes as usize,
            configured: stripe.volumes(),
        });
    }
    if trailer.logical_end() != end {
        return Err(ScratchError::CorruptToc(format!(
            "trailer describes {} bytes but unit holds {}",
            trailer.logical_end(),
            end
        )));
    }

    let mut image = vec![0u8; trailer.toc_len as usize];
    stripe::read(volumes, stripe, trailer.data_end, &mut image, UnwrittenReadPolicy::ZeroFill, unit)?;
    trailer.verify(&image)?;
    let toc = toc::deserialize(&image)?;

    let high_water = trailer.data_end.max(toc.end_of_entries());
    debug!(unit, entries = toc.len(), toc_len = trailer.toc_len, "loaded TOC");
    Ok((toc, high_water))
}

/// Append the TOC image and trailer, then trim volumes to the new end
fn store_toc(state: &mut OpenState) -> Result<()> {
    let image = toc::serialize(&state.toc)?;
    let trailer = Trailer::for_image(&image, state.high_water, state.stripe.volumes() as u16);

    let after = stripe::write(&mut state.volumes, &state.stripe, state.high_water, &image)?;
    stripe::write(&mut state.volumes, &state.stripe, after, &trailer.encode())?;

    trim_volumes(&state.stripe, &mut state.volumes, trailer.logical_end())?;

    debug!(entries = state.toc.len(), toc_len = image.len(), data_end = %state.high_water, "stored TOC");
    Ok(())
}

/// Cut every volume so the unit ends exactly at logical byte `end`
fn trim_volumes(stripe: &Stripe, volumes: &mut [Volume], end: u128) -> Result<()> {
    for volume in volumes {
        let len = stripe.volume_len(end, volume.index());
        let len = u64::try_from(len).map_err(|_| {
            ScratchError::InvalidAddress(format!("volume length {} exceeds u64", len))
        })?;
        volume.set_len(len)?;
    }
    Ok(())
}

/// Copy an entry's current bytes to `to`
fn relocate(unit: usize, state: &mut OpenState, entry: &TocEntry, to: Address) -> Result<()> {
    let len = usize::try_from(entry.length()).map_err(|_| ScratchError::EntryTooLarge {
        key: entry.key().to_string(),
        length: entry.length(),
    })?;
    let mut bytes = vec![0u8; len];
    stripe::read(
        &mut state.volumes,
        &state.stripe,
        entry.start(),
        &mut bytes,
        UnwrittenReadPolicy::ZeroFill,
        unit,
    )?;
    stripe::write(&mut state.volumes, &state.stripe, to, &bytes)?;
    debug!(unit, key = entry.key(), from = %entry.start(), to = %to, "relocated entry");
    Ok(())
}
