//! # scratchio
//!
//! Paged scratch storage for long-running numerical jobs:
//! - Numbered logical units, each striped round-robin over 1..=8 volume files
//! - Two-part `(page, offset)` addressing independent of native file offsets
//! - Per-unit table of contents mapping symbolic keys to byte ranges
//! - TOC persisted at the tail of each unit and reloaded on open
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Registry / SharedRegistry                  │
//! │              (unit slots 0..max_units, config)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                           Unit                              │
//! │            (open/close, keyed + raw read/write)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │     TOC     │          │    Stripe    │
//!   │ (key→range) │          │ (addr→chunks)│
//!   └─────────────┘          └──────┬───────┘
//!                                   │
//!                                   ▼
//!                           ┌──────────────┐
//!                           │   Volumes    │
//!                           │   (files)    │
//!                           └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod address;
pub mod volume;
pub mod toc;
pub mod stripe;
pub mod unit;
pub mod registry;
pub mod shared;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use address::{Address, PAGE_SIZE};
pub use config::{Config, UnwrittenReadPolicy, MAX_UNITS, MAX_VOLUMES};
pub use error::{Result, ScratchError};
pub use registry::Registry;
pub use shared::SharedRegistry;
pub use toc::{Toc, TocEntry, MAX_KEY_LEN};
pub use unit::{OpenStatus, Unit, UnitStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of scratchio
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
