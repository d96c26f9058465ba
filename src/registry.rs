//! Registry
//!
//! Owns the table of unit slots and the configuration they were derived from.
//!
//! ## Responsibilities
//! - Build the unit table once (`initialize` is idempotent)
//! - Validate unit ids and route calls to the addressed unit
//! - Force-close (keeping data) every open unit on `shutdown`
//!
//! The registry performs no I/O itself. It is an explicit context object:
//! independent registries can coexist, e.g. one per test.

use tracing::{info, warn};

use crate::config::{Config, UnitLayout};
use crate::error::{Result, ScratchError};
use crate::shared::SharedRegistry;
use crate::toc::TocEntry;
use crate::unit::{OpenStatus, Unit};

/// Table of unit slots indexed by small integer ids
#[derive(Debug)]
pub struct Registry {
    config: Config,
    /// `None` until initialized and after shutdown
    units: Option<Vec<Unit>>,
}

impl Registry {
    /// Create an uninitialized registry
    pub fn new(config: Config) -> Self {
        Self {
            config,
            units: None,
        }
    }

    /// Create and initialize in one step
    pub fn open(config: Config) -> Result<Self> {
        let mut registry = Self::new(config);
        registry.initialize()?;
        Ok(registry)
    }

    /// Build the unit table; a no-op when already initialized
    ///
    /// Fails with `AllocationFailure` if the table cannot be allocated, which
    /// callers should treat as fatal (see [`ScratchError::is_fatal`]).
    pub fn initialize(&mut self) -> Result<()> {
        if self.units.is_some() {
            return Ok(());
        }
        self.config.validate()?;

        let max = self.config.max_units;
        let mut units = Vec::new();
        units.try_reserve_exact(max).map_err(|e| {
            ScratchError::AllocationFailure(format!("unit table of {} slots: {}", max, e))
        })?;
        for id in 0..max {
            let layout = self.config.unit_layout(id);
            units.push(Unit::new(id, layout, self.config.unwritten_reads));
        }

        info!(
            max_units = max,
            volumes = self.config.volumes,
            base_dir = %self.config.base_dir.display(),
            "initialized scratch registry"
        );
        self.units = Some(units);
        Ok(())
    }

    /// Whether the unit table is live
    pub fn is_initialized(&self) -> bool {
        self.units.is_some()
    }

    /// Close every open unit (keeping its data) and release the table
    ///
    /// All units are closed even if some fail; the first error is returned.
    /// Shutting down an uninitialized registry is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(mut units) = self.units.take() else {
            return Ok(());
        };

        let mut first_err = None;
        let mut forced = 0usize;
        for unit in units.iter_mut().filter(|u| u.is_open()) {
            forced += 1;
            warn!(unit = unit.id(), "unit still open at shutdown, closing with data kept");
            if let Err(e) = unit.close(true) {
                warn!(unit = unit.id(), error = %e, "forced close failed");
                first_err.get_or_insert(e);
            }
        }

        info!(forced_closes = forced, "shut down scratch registry");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Unit Access
    // =========================================================================

    /// The unit in slot `id`
    pub fn unit(&mut self, id: usize) -> Result<&mut Unit> {
        let max = self.config.max_units;
        let units = self.units.as_mut().ok_or(ScratchError::NotInitialized)?;
        units
            .get_mut(id)
            .ok_or(ScratchError::InvalidUnitId { id, max })
    }

    /// Shared view of the unit in slot `id`
    pub fn unit_ref(&self, id: usize) -> Result<&Unit> {
        let max = self.config.max_units;
        let units = self.units.as_ref().ok_or(ScratchError::NotInitialized)?;
        units.get(id).ok_or(ScratchError::InvalidUnitId { id, max })
    }

    // =========================================================================
    // Boundary Operations
    // =========================================================================

    pub fn open_unit(&mut self, id: usize, status: OpenStatus) -> Result<()> {
        self.unit(id)?.open(status)
    }

    pub fn close_unit(&mut self, id: usize, keep_data: bool) -> Result<()> {
        self.unit(id)?.close(keep_data)
    }

    pub fn write(&mut self, id: usize, key: &str, data: &[u8]) -> Result<()> {
        self.unit(id)?.write(key, data)
    }

    pub fn read(&mut self, id: usize, key: &str) -> Result<Vec<u8>> {
        self.unit(id)?.read(key)
    }

    pub fn delete_entry(&mut self, id: usize, key: &str) -> Result<TocEntry> {
        self.unit(id)?.delete_entry(key)
    }

    /// Delete the backing files of closed unit `id` without reading its TOC
    ///
    /// Returns how many files were removed.
    pub fn purge(&mut self, id: usize) -> Result<usize> {
        self.unit(id)?.remove_files()
    }

    /// Whether unit `id` has any backing file on disk
    pub fn exists(&self, id: usize) -> Result<bool> {
        Ok(self.unit_ref(id)?.exists())
    }

    /// Whether unit `id` is currently open
    pub fn is_open(&self, id: usize) -> Result<bool> {
        Ok(self.unit_ref(id)?.is_open())
    }

    /// Derived volume files of unit `id`
    pub fn unit_paths(&self, id: usize) -> Result<&UnitLayout> {
        Ok(self.unit_ref(id)?.layout())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Exit code embedding applications should use for fatal errors
    pub fn error_exit_code(&self) -> i32 {
        self.config.error_exit_code
    }

    /// Move every unit slot behind its own lock
    pub fn into_shared(mut self) -> Result<SharedRegistry> {
        let units = self.units.take().ok_or(ScratchError::NotInitialized)?;
        Ok(SharedRegistry::from_units(self.config, units))
    }
}
