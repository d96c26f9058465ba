//! Tests for Volume
//!
//! These tests verify:
//! - Open with and without creation
//! - Positioned read/write
//! - Short reads past end of file
//! - Close with and without deleting the backing file

use scratchio::volume::Volume;
use scratchio::ScratchError;
use tempfile::TempDir;

#[test]
fn test_open_missing_without_create_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absent.0");

    let result = Volume::open(&path, 0, false);

    assert!(matches!(result, Err(ScratchError::Io { volume: 0, .. })));
    assert!(!path.exists());
}

#[test]
fn test_open_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("dir").join("vol.0");

    let volume = Volume::open(&path, 0, true).unwrap();

    assert!(path.exists());
    assert!(volume.is_open());
    assert!(volume.is_empty().unwrap());
}

#[test]
fn test_write_then_read_at_offset() {
    let temp = TempDir::new().unwrap();
    let mut volume = Volume::open(&temp.path().join("v"), 2, true).unwrap();

    volume.write_at(4096, b"hello volume").unwrap();

    let mut buf = [0u8; 12];
    let filled = volume.read_at(4096, &mut buf).unwrap();

    assert_eq!(filled, 12);
    assert_eq!(&buf, b"hello volume");
    assert_eq!(volume.len().unwrap(), 4096 + 12);
    assert_eq!(volume.index(), 2);
}

#[test]
fn test_read_past_end_reports_short_fill() {
    let temp = TempDir::new().unwrap();
    let mut volume = Volume::open(&temp.path().join("v"), 0, true).unwrap();
    volume.write_at(0, b"abcd").unwrap();

    let mut buf = [0xFFu8; 8];
    let filled = volume.read_at(2, &mut buf).unwrap();

    assert_eq!(filled, 2);
    assert_eq!(&buf[..2], b"cd");
    assert_eq!(&buf[2..], &[0xFF; 6]); // untouched
}

#[test]
fn test_set_len_truncates() {
    let temp = TempDir::new().unwrap();
    let mut volume = Volume::open(&temp.path().join("v"), 0, true).unwrap();
    volume.write_at(0, &[1u8; 100]).unwrap();

    volume.set_len(10).unwrap();

    assert_eq!(volume.len().unwrap(), 10);
}

#[test]
fn test_close_keeps_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v");
    let mut volume = Volume::open(&path, 0, true).unwrap();
    volume.write_at(0, b"keep").unwrap();

    volume.close(false).unwrap();

    assert!(!volume.is_open());
    assert_eq!(std::fs::read(&path).unwrap(), b"keep");
}

#[test]
fn test_close_deletes_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v");
    let mut volume = Volume::open(&path, 0, true).unwrap();
    volume.write_at(0, b"gone").unwrap();

    volume.close(true).unwrap();

    assert!(!path.exists());
}

#[test]
fn test_io_on_closed_volume_fails_with_context() {
    let temp = TempDir::new().unwrap();
    let mut volume = Volume::open(&temp.path().join("v"), 3, true).unwrap();
    volume.close(false).unwrap();

    let result = volume.write_at(0, b"x");

    assert!(matches!(result, Err(ScratchError::Io { volume: 3, .. })));
}

#[test]
fn test_reopen_existing_without_create() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v");
    {
        let mut volume = Volume::open(&path, 0, true).unwrap();
        volume.write_at(0, b"persisted").unwrap();
        volume.close(false).unwrap();
    }

    let mut volume = Volume::open(&path, 0, false).unwrap();
    let mut buf = [0u8; 9];
    volume.read_at(0, &mut buf).unwrap();

    assert_eq!(&buf, b"persisted");
}
