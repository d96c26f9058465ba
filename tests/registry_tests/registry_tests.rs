//! Tests for Registry and SharedRegistry
//!
//! These tests verify:
//! - Idempotent initialization and shutdown
//! - Unit id validation
//! - Boundary operations routed to units
//! - Forced close (keeping data) on shutdown
//! - Per-unit locking in the shared registry

use std::sync::Arc;
use std::thread;

use scratchio::{Config, OpenStatus, Registry, ScratchError, PAGE_SIZE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_registry(volumes: usize) -> (TempDir, Registry) {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .base_dir(temp.path())
        .volumes(volumes)
        .max_units(32)
        .build();
    let registry = Registry::open(config).unwrap();
    (temp, registry)
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_new_registry_is_uninitialized() {
    let mut registry = Registry::new(Config::default());

    assert!(!registry.is_initialized());
    assert!(matches!(registry.unit(0), Err(ScratchError::NotInitialized)));
}

#[test]
fn test_initialize_is_idempotent() {
    let (_temp, mut registry) = setup_registry(1);
    registry.open_unit(3, OpenStatus::New).unwrap();

    registry.initialize().unwrap();

    // The existing table (and its open unit) is untouched
    assert!(registry.is_open(3).unwrap());
}

#[test]
fn test_initialize_rejects_invalid_config() {
    let mut registry = Registry::new(Config::builder().volumes(0).build());

    assert!(matches!(registry.initialize(), Err(ScratchError::Config(_))));
    assert!(!registry.is_initialized());
}

#[test]
fn test_shutdown_force_closes_and_keeps_data() {
    let (temp, mut registry) = setup_registry(2);
    registry.open_unit(5, OpenStatus::New).unwrap();
    registry.write(5, "state", b"checkpoint").unwrap();

    registry.shutdown().unwrap();

    assert!(!registry.is_initialized());
    assert!(matches!(registry.exists(5), Err(ScratchError::NotInitialized)));

    // A fresh registry over the same directory sees the data
    let config = Config::builder().base_dir(temp.path()).volumes(2).max_units(32).build();
    let mut again = Registry::open(config).unwrap();
    again.open_unit(5, OpenStatus::Old).unwrap();
    assert_eq!(again.read(5, "state").unwrap(), b"checkpoint");
}

#[test]
fn test_shutdown_twice_is_noop() {
    let (_temp, mut registry) = setup_registry(1);

    registry.shutdown().unwrap();
    registry.shutdown().unwrap();
}

#[test]
fn test_reinitialize_after_shutdown() {
    let (_temp, mut registry) = setup_registry(1);
    registry.shutdown().unwrap();

    registry.initialize().unwrap();

    assert!(registry.is_initialized());
    assert!(!registry.is_open(0).unwrap());
}

// =============================================================================
// Unit Id Tests
// =============================================================================

#[test]
fn test_invalid_unit_id() {
    let (_temp, mut registry) = setup_registry(1);

    let result = registry.open_unit(32, OpenStatus::New);

    assert!(matches!(result, Err(ScratchError::InvalidUnitId { id: 32, max: 32 })));
    assert!(matches!(registry.exists(100), Err(ScratchError::InvalidUnitId { .. })));
}

#[test]
fn test_last_valid_unit_id() {
    let (_temp, mut registry) = setup_registry(1);

    registry.open_unit(31, OpenStatus::New).unwrap();

    assert!(registry.is_open(31).unwrap());
}

// =============================================================================
// Boundary Operation Tests
// =============================================================================

#[test]
fn test_exists_tracks_backing_files() {
    let (_temp, mut registry) = setup_registry(2);

    assert!(!registry.exists(7).unwrap());
    registry.open_unit(7, OpenStatus::New).unwrap();
    assert!(registry.exists(7).unwrap());
    registry.close_unit(7, false).unwrap();
    assert!(!registry.exists(7).unwrap());
}

#[test]
fn test_unit_paths_are_deterministic() {
    let (temp, registry) = setup_registry(3);

    let layout = registry.unit_paths(12).unwrap();

    assert_eq!(layout.volumes(), 3);
    assert_eq!(layout.paths[0], temp.path().join("scratch.12.0"));
    assert_eq!(layout.paths[2], temp.path().join("scratch.12.2"));
}

#[test]
fn test_units_are_independent() {
    let (_temp, mut registry) = setup_registry(1);
    registry.open_unit(1, OpenStatus::New).unwrap();
    registry.open_unit(2, OpenStatus::New).unwrap();

    registry.write(1, "k", b"one").unwrap();
    registry.write(2, "k", b"two").unwrap();

    assert_eq!(registry.read(1, "k").unwrap(), b"one");
    assert_eq!(registry.read(2, "k").unwrap(), b"two");
    registry.close_unit(1, false).unwrap();
    assert_eq!(registry.read(2, "k").unwrap(), b"two");
}

#[test]
fn test_delete_entry_routes_to_unit() {
    let (_temp, mut registry) = setup_registry(1);
    registry.open_unit(4, OpenStatus::New).unwrap();
    registry.write(4, "k", b"v").unwrap();

    registry.delete_entry(4, "k").unwrap();

    assert!(matches!(registry.read(4, "k"), Err(ScratchError::KeyNotFound(_))));
    assert!(matches!(registry.delete_entry(4, "k"), Err(ScratchError::KeyNotFound(_))));
}

#[test]
fn test_per_unit_volume_override() {
    let temp = TempDir::new().unwrap();
    let fast = temp.path().join("fast");
    let slow = temp.path().join("slow");
    let config = Config::builder()
        .base_dir(temp.path())
        .max_units(8)
        .unit_volumes(2, [&fast, &slow])
        .build();
    let mut registry = Registry::open(config).unwrap();

    registry.open_unit(2, OpenStatus::New).unwrap();
    registry.write(2, "big", &vec![3u8; 3 * PAGE_SIZE as usize]).unwrap();
    registry.close_unit(2, true).unwrap();

    assert!(fast.join("scratch.2.0").exists());
    assert!(slow.join("scratch.2.1").exists());
}

#[test]
fn test_error_exit_code_and_fatality() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().base_dir(temp.path()).error_exit_code(42).build();
    let registry = Registry::open(config).unwrap();

    assert_eq!(registry.error_exit_code(), 42);
    assert!(ScratchError::AllocationFailure("table".to_string()).is_fatal());
    assert!(!ScratchError::NotOpen(1).is_fatal());
    let oversized = ScratchError::EntryTooLarge {
        key: "huge".to_string(),
        length: u64::MAX,
    };
    assert!(!oversized.is_fatal());
}

#[test]
fn test_purge_removes_unit_with_damaged_toc() {
    let (_temp, mut registry) = setup_registry(2);
    registry.open_unit(6, OpenStatus::New).unwrap();
    registry.write(6, "k", b"value").unwrap();
    registry.close_unit(6, true).unwrap();

    let path = registry.unit_paths(6).unwrap().paths[0].clone();
    std::fs::write(&path, b"torn").unwrap();
    assert!(matches!(registry.open_unit(6, OpenStatus::Old), Err(ScratchError::CorruptToc(_))));

    assert_eq!(registry.purge(6).unwrap(), 2);
    assert!(!registry.exists(6).unwrap());
}

#[test]
fn test_purge_refuses_open_unit() {
    let (_temp, mut registry) = setup_registry(1);
    registry.open_unit(2, OpenStatus::New).unwrap();

    assert!(matches!(registry.purge(2), Err(ScratchError::AlreadyOpen(2))));
    assert!(registry.exists(2).unwrap());
}

// =============================================================================
// Shared Registry Tests
// =============================================================================

#[test]
fn test_shared_registry_parallel_units() {
    let (_temp, registry) = setup_registry(2);
    let shared = Arc::new(registry.into_shared().unwrap());

    let handles: Vec<_> = (0..8usize)
        .map(|id| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                shared.open_unit(id, OpenStatus::New).unwrap();
                for i in 0..10u8 {
                    let payload = vec![id as u8 ^ i; 1000 + i as usize];
                    shared.write(id, &format!("rec{}", i), &payload).unwrap();
                }
                shared.close_unit(id, true).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for id in 0..8usize {
        shared.open_unit(id, OpenStatus::Old).unwrap();
        for i in 0..10u8 {
            let payload = shared.read(id, &format!("rec{}", i)).unwrap();
            assert_eq!(payload, vec![id as u8 ^ i; 1000 + i as usize]);
        }
    }
    shared.shutdown().unwrap();
    assert!(!shared.is_open(0).unwrap());
}

#[test]
fn test_shared_registry_serializes_same_unit() {
    let (_temp, registry) = setup_registry(1);
    let shared = Arc::new(registry.into_shared().unwrap());
    shared.open_unit(0, OpenStatus::New).unwrap();

    let handles: Vec<_> = (0..4usize)
        .map(|t| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for i in 0..25 {
                    shared
                        .write(0, &format!("t{}-{}", t, i), &[t as u8; 64])
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let count = shared.with_unit(0, |unit| Ok(unit.toc()?.len())).unwrap();
    assert_eq!(count, 100);
    for t in 0..4usize {
        assert_eq!(shared.read(0, &format!("t{}-7", t)).unwrap(), vec![t as u8; 64]);
    }
}

#[test]
fn test_shared_registry_invalid_id() {
    let (_temp, registry) = setup_registry(1);
    let shared = registry.into_shared().unwrap();

    assert!(matches!(shared.lock(99), Err(ScratchError::InvalidUnitId { id: 99, .. })));
}
