//! Two-part unit addresses
//!
//! A logical byte position inside a unit is kept as a `(page, offset)` pair so
//! positions can exceed native file-offset range and the owning volume of any
//! byte can be derived from the page number alone.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScratchError};

/// Size of one page in bytes
pub const PAGE_SIZE: u64 = 64 * 1024;

/// A logical position within a unit
///
/// Ordering is by logical position: `page` is compared first, then `offset`,
/// which is equivalent because `offset < PAGE_SIZE` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u64, u64)", into = "(u64, u64)")]
pub struct Address {
    page: u64,
    offset: u64,
}

impl Address {
    /// The first byte of every unit
    pub const ZERO: Address = Address { page: 0, offset: 0 };

    /// Build an address, rejecting intra-page offsets outside the page
    pub fn new(page: u64, offset: u64) -> Result<Self> {
        if offset >= PAGE_SIZE {
            return Err(ScratchError::InvalidAddress(format!(
                "offset {} must be below page size {}",
                offset, PAGE_SIZE
            )));
        }
        Ok(Self { page, offset })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Flatten into a single logical byte position
    pub fn to_logical(self) -> u128 {
        self.page as u128 * PAGE_SIZE as u128 + self.offset as u128
    }

    /// Split a logical byte position back into page and offset
    ///
    /// Fails if the page number does not fit in 64 bits.
    pub fn from_logical(pos: u128) -> Result<Self> {
        let page = pos / PAGE_SIZE as u128;
        let offset = (pos % PAGE_SIZE as u128) as u64;
        let page = u64::try_from(page).map_err(|_| {
            ScratchError::InvalidAddress(format!("logical position {} exceeds page range", pos))
        })?;
        Ok(Self { page, offset })
    }

    /// Move forward by `n` bytes, carrying offset overflow into the page
    pub fn advance(self, n: u64) -> Result<Self> {
        let carry = (self.offset + n % PAGE_SIZE) / PAGE_SIZE;
        let offset = (self.offset + n % PAGE_SIZE) % PAGE_SIZE;
        let page = self
            .page
            .checked_add(n / PAGE_SIZE)
            .and_then(|p| p.checked_add(carry))
            .ok_or_else(|| {
                ScratchError::InvalidAddress(format!("advancing {} by {} bytes overflows", self, n))
            })?;
        Ok(Self { page, offset })
    }

    /// Number of bytes from `earlier` to `self`, or `None` if `earlier` is later
    pub fn distance_from(self, earlier: Address) -> Option<u128> {
        self.to_logical().checked_sub(earlier.to_logical())
    }

    /// Bytes left in this address's page, counting the addressed byte
    pub fn page_remaining(&self) -> u64 {
        PAGE_SIZE - self.offset
    }
}

impl TryFrom<(u64, u64)> for Address {
    type Error = ScratchError;

    fn try_from((page, offset): (u64, u64)) -> Result<Self> {
        Address::new(page, offset)
    }
}

impl From<Address> for (u64, u64) {
    fn from(addr: Address) -> Self {
        (addr.page, addr.offset)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page, self.offset)
    }
}
