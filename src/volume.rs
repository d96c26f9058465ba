//! Volume
//!
//! One physical backing file of a unit. Volumes only do positioned I/O;
//! the page-to-volume mapping lives in [`crate::stripe`].

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::{Result, ScratchError};

/// A single backing file plus its open/closed state
#[derive(Debug)]
pub struct Volume {
    /// Backing file path
    path: PathBuf,
    /// Ordinal within the owning unit
    index: usize,
    /// Open handle, `None` once closed
    file: Option<File>,
}

impl Volume {
    /// Open the backing file at `path`
    ///
    /// Fails if the file is missing and `create_if_missing` is false, or if the
    /// file cannot be opened for reading and writing.
    pub fn open(path: &Path, index: usize, create_if_missing: bool) -> Result<Self> {
        if create_if_missing {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(ScratchError::io(index, 0, 0))?;
                }
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create_if_missing)
            .open(path)
            .map_err(ScratchError::io(index, 0, 0))?;

        trace!(volume = index, path = %path.display(), "opened volume");

        Ok(Self {
            path: path.to_path_buf(),
            index,
            file: Some(file),
        })
    }

    /// Flush and release the handle, optionally removing the backing file
    ///
    /// Closing an already-closed volume only performs the optional delete.
    pub fn close(&mut self, delete_after: bool) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all().map_err(ScratchError::io(self.index, 0, 0))?;
        }

        if delete_after {
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(ScratchError::io(self.index, 0, 0)(e)),
            }
        }

        trace!(volume = self.index, delete_after, "closed volume");
        Ok(())
    }

    /// Read into `buf` starting at `physical_offset`
    ///
    /// Returns how many bytes the file actually held; bytes past the end of the
    /// file are left untouched in `buf`.
    pub fn read_at(&mut self, physical_offset: u64, buf: &mut [u8]) -> Result<usize> {
        let index = self.index;
        let length = buf.len() as u64;
        let file = self.handle()?;
        let wrap = ScratchError::io(index, physical_offset, length);

        file.seek(SeekFrom::Start(physical_offset)).map_err(wrap)?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ScratchError::io(index, physical_offset, length)(e)),
            }
        }

        trace!(volume = index, offset = physical_offset, length, filled, "volume read");
        Ok(filled)
    }

    /// Write all of `data` starting at `physical_offset`
    pub fn write_at(&mut self, physical_offset: u64, data: &[u8]) -> Result<()> {
        let index = self.index;
        let length = data.len() as u64;
        let file = self.handle()?;

        file.seek(SeekFrom::Start(physical_offset))
            .map_err(ScratchError::io(index, physical_offset, length))?;
        file.write_all(data)
            .map_err(ScratchError::io(index, physical_offset, length))?;

        trace!(volume = index, offset = physical_offset, length, "volume write");
        Ok(())
    }

    /// Current size of the backing file
    pub fn len(&self) -> Result<u64> {
        let index = self.index;
        let file = self.file.as_ref().ok_or_else(|| closed_handle(index))?;
        let meta = file.metadata().map_err(ScratchError::io(index, 0, 0))?;
        Ok(meta.len())
    }

    /// Whether the backing file holds no bytes
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Resize the backing file to exactly `size` bytes
    pub fn set_len(&mut self, size: u64) -> Result<()> {
        let index = self.index;
        let file = self.handle()?;
        file.set_len(size).map_err(ScratchError::io(index, size, 0))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn handle(&mut self) -> Result<&mut File> {
        let index = self.index;
        self.file.as_mut().ok_or_else(|| closed_handle(index))
    }
}

fn closed_handle(index: usize) -> ScratchError {
    ScratchError::io(index, 0, 0)(std::io::Error::new(
        ErrorKind::NotConnected,
        "volume handle is closed",
    ))
}
