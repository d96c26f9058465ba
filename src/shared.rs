//! Shared Registry
//!
//! A thread-safe view of a registry with one exclusive lock per unit slot.
//!
//! ## Concurrency:
//! - Each unit sits behind its own `parking_lot::Mutex`
//! - Calls on the same unit are serialized in lock-acquisition order
//! - Calls on different units proceed in parallel
//! - All methods use `&self`, so the registry can be shared through an `Arc`

use parking_lot::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, ScratchError};
use crate::toc::TocEntry;
use crate::unit::{OpenStatus, Unit};

/// Registry whose unit slots can be used from many threads
#[derive(Debug)]
pub struct SharedRegistry {
    config: Config,
    units: Vec<Mutex<Unit>>,
}

impl SharedRegistry {
    pub(crate) fn from_units(config: Config, units: Vec<Unit>) -> Self {
        Self {
            config,
            units: units.into_iter().map(Mutex::new).collect(),
        }
    }

    /// Lock the unit in slot `id`
    ///
    /// The guard holds the unit exclusively until dropped.
    pub fn lock(&self, id: usize) -> Result<MutexGuard<'_, Unit>> {
        self.units
            .get(id)
            .map(|slot| slot.lock())
            .ok_or(ScratchError::InvalidUnitId {
                id,
                max: self.config.max_units,
            })
    }

    /// Run `f` with exclusive access to unit `id`
    pub fn with_unit<T>(&self, id: usize, f: impl FnOnce(&mut Unit) -> Result<T>) -> Result<T> {
        let mut unit = self.lock(id)?;
        f(&mut unit)
    }

    pub fn open_unit(&self, id: usize, status: OpenStatus) -> Result<()> {
        self.with_unit(id, |unit| unit.open(status))
    }

    pub fn close_unit(&self, id: usize, keep_data: bool) -> Result<()> {
        self.with_unit(id, |unit| unit.close(keep_data))
    }

    pub fn write(&self, id: usize, key: &str, data: &[u8]) -> Result<()> {
        self.with_unit(id, |unit| unit.write(key, data))
    }

    pub fn read(&self, id: usize, key: &str) -> Result<Vec<u8>> {
        self.with_unit(id, |unit| unit.read(key))
    }

    pub fn delete_entry(&self, id: usize, key: &str) -> Result<TocEntry> {
        self.with_unit(id, |unit| unit.delete_entry(key))
    }

    pub fn purge(&self, id: usize) -> Result<usize> {
        self.with_unit(id, |unit| unit.remove_files())
    }

    pub fn exists(&self, id: usize) -> Result<bool> {
        Ok(self.lock(id)?.exists())
    }

    pub fn is_open(&self, id: usize) -> Result<bool> {
        Ok(self.lock(id)?.is_open())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Close every open unit, keeping its data
    ///
    /// Units stay usable afterwards; all are attempted and the first error is
    /// returned.
    pub fn shutdown(&self) -> Result<()> {
        let mut first_err = None;
        for slot in &self.units {
            let mut unit = slot.lock();
            if !unit.is_open() {
                continue;
            }
            warn!(unit = unit.id(), "unit still open at shutdown, closing with data kept");
            if let Err(e) = unit.close(true) {
                first_err.get_or_insert(e);
            }
        }
        info!("shut down shared scratch registry");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
