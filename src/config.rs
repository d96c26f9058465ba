//! Configuration for scratchio
//!
//! Centralized configuration with sensible defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScratchError};

/// Default number of unit slots in a registry
pub const MAX_UNITS: usize = 500;

/// Most volumes a single unit may be striped over
pub const MAX_VOLUMES: usize = 8;

/// Main configuration for a scratch registry
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // File Layout
    // -------------------------------------------------------------------------
    /// Directory used for any volume without an explicit directory
    /// Volume files are named:
    ///   {dir}/{file_prefix}.{unit}.{volume}
    pub base_dir: PathBuf,

    /// Leading component of every volume file name
    pub file_prefix: String,

    /// Default number of volumes per unit
    pub volumes: usize,

    /// Per-volume directories (volume i uses volume_dirs[i] when present)
    pub volume_dirs: Vec<PathBuf>,

    /// Per-unit volume directories, overriding the defaults above
    pub unit_volume_dirs: BTreeMap<usize, Vec<PathBuf>>,

    // -------------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------------
    /// Number of unit slots
    pub max_units: usize,

    /// Exit code embedding applications use when escalating a fatal error
    pub error_exit_code: i32,

    // -------------------------------------------------------------------------
    // Read Behaviour
    // -------------------------------------------------------------------------
    /// What a read of never-written bytes returns
    pub unwritten_reads: UnwrittenReadPolicy,
}

/// Policy for reads covering bytes no volume file holds yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnwrittenReadPolicy {
    /// Return zeros for the unwritten tail (scratch semantics)
    #[default]
    ZeroFill,

    /// Fail with `UnwrittenRegion`
    Error,
}

/// Resolved file layout of one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLayout {
    /// Volume file paths, in volume order
    pub paths: Vec<PathBuf>,
}

impl UnitLayout {
    pub fn volumes(&self) -> usize {
        self.paths.len()
    }

    /// Whether any backing file exists on disk
    pub fn any_exists(&self) -> bool {
        self.paths.iter().any(|p| p.exists())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./scratch"),
            file_prefix: "scratch".to_string(),
            volumes: 1,
            volume_dirs: Vec::new(),
            unit_volume_dirs: BTreeMap::new(),
            max_units: MAX_UNITS,
            error_exit_code: 1,
            unwritten_reads: UnwrittenReadPolicy::ZeroFill,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check limits and overrides
    pub fn validate(&self) -> Result<()> {
        check_volume_count(self.volumes, "default volume count")?;
        if self.max_units == 0 {
            return Err(ScratchError::Config("max_units must be at least 1".to_string()));
        }
        if self.file_prefix.is_empty() {
            return Err(ScratchError::Config("file_prefix must not be empty".to_string()));
        }
        for (&unit, dirs) in &self.unit_volume_dirs {
            if unit >= self.max_units {
                return Err(ScratchError::Config(format!(
                    "override for unit {} is outside 0..{}",
                    unit, self.max_units
                )));
            }
            check_volume_count(dirs.len(), &format!("unit {} volume count", unit))?;
        }
        Ok(())
    }

    /// Derive the volume file paths for `unit`
    pub fn unit_layout(&self, unit: usize) -> UnitLayout {
        let paths = match self.unit_volume_dirs.get(&unit) {
            Some(dirs) => dirs
                .iter()
                .enumerate()
                .map(|(v, dir)| self.volume_path(dir, unit, v))
                .collect(),
            None => (0..self.volumes)
                .map(|v| {
                    let dir = self.volume_dirs.get(v).unwrap_or(&self.base_dir);
                    self.volume_path(dir, unit, v)
                })
                .collect(),
        };
        UnitLayout { paths }
    }

    fn volume_path(&self, dir: &Path, unit: usize, volume: usize) -> PathBuf {
        dir.join(format!("{}.{}.{}", self.file_prefix, unit, volume))
    }
}

fn check_volume_count(count: usize, what: &str) -> Result<()> {
    if count == 0 || count > MAX_VOLUMES {
        return Err(ScratchError::Config(format!(
            "{} must be in 1..={}, got {}",
            what, MAX_VOLUMES, count
        )));
    }
    Ok(())
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the base directory for volume files
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_dir = path.into();
        self
    }

    /// Set the file name prefix
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// Set the default number of volumes per unit
    pub fn volumes(mut self, count: usize) -> Self {
        self.config.volumes = count;
        self
    }

    /// Set per-volume directories for units without an override
    pub fn volume_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.volume_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Stripe `unit` over exactly the given directories
    pub fn unit_volumes<I, P>(mut self, unit: usize, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config
            .unit_volume_dirs
            .insert(unit, dirs.into_iter().map(Into::into).collect());
        self
    }

    /// Set the number of unit slots
    pub fn max_units(mut self, count: usize) -> Self {
        self.config.max_units = count;
        self
    }

    /// Set the exit code used when escalating fatal errors
    pub fn error_exit_code(mut self, code: i32) -> Self {
        self.config.error_exit_code = code;
        self
    }

    /// Set the policy for reads of never-written bytes
    pub fn unwritten_reads(mut self, policy: UnwrittenReadPolicy) -> Self {
        self.config.unwritten_reads = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
