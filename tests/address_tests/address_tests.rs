//! Tests for Address
//!
//! These tests verify:
//! - Checked construction (offset must stay inside the page)
//! - Logical position round-trips
//! - Carry from offset into page when advancing
//! - Ordering by logical position

use scratchio::{Address, ScratchError, PAGE_SIZE};

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_new_accepts_last_byte_of_page() {
    let addr = Address::new(7, PAGE_SIZE - 1).unwrap();

    assert_eq!(addr.page(), 7);
    assert_eq!(addr.offset(), PAGE_SIZE - 1);
}

#[test]
fn test_new_rejects_offset_at_page_size() {
    let result = Address::new(0, PAGE_SIZE);

    assert!(matches!(result, Err(ScratchError::InvalidAddress(_))));
}

#[test]
fn test_zero_is_default() {
    assert_eq!(Address::ZERO, Address::default());
    assert_eq!(Address::ZERO.to_logical(), 0);
}

// =============================================================================
// Logical Position Tests
// =============================================================================

#[test]
fn test_logical_round_trip() {
    let samples = [
        (0, 0),
        (0, PAGE_SIZE - 1),
        (1, 0),
        (12345, 678),
        (u64::MAX, PAGE_SIZE - 1),
    ];

    for (page, offset) in samples {
        let addr = Address::new(page, offset).unwrap();
        let back = Address::from_logical(addr.to_logical()).unwrap();
        assert_eq!(addr, back, "round trip failed for {}:{}", page, offset);
    }
}

#[test]
fn test_to_logical_beyond_u64() {
    let addr = Address::new(u64::MAX, 0).unwrap();

    assert!(addr.to_logical() > u64::MAX as u128);
}

#[test]
fn test_from_logical_rejects_page_overflow() {
    let too_far = (u64::MAX as u128 + 1) * PAGE_SIZE as u128;

    assert!(matches!(
        Address::from_logical(too_far),
        Err(ScratchError::InvalidAddress(_))
    ));
}

// =============================================================================
// Advance Tests
// =============================================================================

#[test]
fn test_advance_within_page() {
    let addr = Address::new(2, 100).unwrap().advance(50).unwrap();

    assert_eq!(addr, Address::new(2, 150).unwrap());
}

#[test]
fn test_advance_matches_logical_arithmetic() {
    let start = Address::new(3, PAGE_SIZE - 10).unwrap();

    for n in [0, 9, 10, 11, PAGE_SIZE, 3 * PAGE_SIZE + 17] {
        let advanced = start.advance(n).unwrap();
        assert_eq!(advanced.to_logical(), start.to_logical() + n as u128);
    }
}

#[test]
fn test_distance_from() {
    let a = Address::new(1, 10).unwrap();
    let b = Address::new(2, 5).unwrap();

    assert_eq!(b.distance_from(a), Some(PAGE_SIZE as u128 - 5));
    assert_eq!(a.distance_from(b), None);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_ordering_follows_logical_position() {
    let a = Address::new(1, PAGE_SIZE - 1).unwrap();
    let b = Address::new(2, 0).unwrap();
    let c = Address::new(2, 1).unwrap();

    assert!(a < b);
    assert!(b < c);
    assert_eq!(a.max(c), c);
}

#[test]
fn test_display() {
    assert_eq!(Address::new(4, 20).unwrap().to_string(), "4:20");
}
