//! Byte accounting for executed batches.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Input byte lengths behind one or more batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ByteLengths {
    /// All bytes read from the transport.
    pub total: usize,
    /// `total` minus bytes of in-band signaling sequences.
    pub excluding_inband: usize,
}

impl ByteLengths {
    /// Create a new length pair.
    #[inline]
    pub const fn new(total: usize, excluding_inband: usize) -> Self {
        Self {
            total,
            excluding_inband,
        }
    }

    /// Bytes spent on in-band signaling.
    #[inline]
    pub const fn inband(&self) -> usize {
        self.total.saturating_sub(self.excluding_inband)
    }

    /// Whether nothing has been accounted yet.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl Add for ByteLengths {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.total + rhs.total,
            self.excluding_inband + rhs.excluding_inband,
        )
    }
}

impl AddAssign for ByteLengths {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for ByteLengths {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
