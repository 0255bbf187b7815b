// Copyright 2026 The loongson-intc Authors.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

use bitvec::{array::BitArray, order::Lsb0};

/// A fixed-size bitmap handing out naturally aligned power-of-two regions.
///
/// A set bit marks a vector as allocated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MsiBitmap {
    bits: BitArray<[u64; 4], Lsb0>,
    size: u32,
}

impl MsiBitmap {
    /// The largest number of bits a bitmap can track.
    pub const CAPACITY: u32 = 256;

    /// Returns an empty bitmap of `size` bits.
    pub const fn new(size: u32) -> Self {
        assert!(size <= Self::CAPACITY);
        Self {
            bits: BitArray::ZERO,
            size,
        }
    }

    /// Returns the number of bits tracked.
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Returns whether the bit is set.
    pub fn test(&self, bit: u32) -> bool {
        bit < self.size && self.bits[bit as usize]
    }

    /// Returns the number of bits set.
    pub fn weight(&self) -> u32 {
        self.bits.count_ones() as u32
    }

    /// Finds the first free region of `2^order` bits aligned to its own size, marks it used and
    /// returns its first bit.
    pub fn find_free_region(&mut self, order: u32) -> Option<u32> {
        let len = 1u32.checked_shl(order)?;
        let mut start: u32 = 0;
        while start.checked_add(len)? <= self.size {
            let region = start as usize..(start + len) as usize;
            if self.bits[region.clone()].not_any() {
                self.bits[region].fill(true);
                return Some(start);
            }
            start += len;
        }
        None
    }

    /// Marks the region of `2^order` bits starting at `start` free.
    pub fn release_region(&mut self, start: u32, order: u32) {
        let Some(len) = 1u32.checked_shl(order) else {
            return;
        };
        let end = start.saturating_add(len).min(self.size);
        if start < end {
            self.bits[start as usize..end as usize].fill(false);
        }
    }
}

/// Returns the order of the smallest power of two not less than `count`.
pub const fn count_order(count: u32) -> u32 {
    if count <= 1 {
        0
    } else {
        u32::BITS - (count - 1).leading_zeros()
    }
}
