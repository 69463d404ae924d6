//! Page and allocation granularity arithmetic.

use crate::os;

/// Type for calculating page numbers and byte offsets.
///
/// The construction of this object is very cheap since it only captures the
/// system's page size (or, via [`Size::alloc`], its allocation granularity).
/// Virtual memory operations are restricted to boundaries of this size, so
/// this type centralizes the rounding arithmetic needed to translate a
/// requested byte count into a valid mapping size.
#[derive(Copy, Clone, Debug)]
pub struct Size {
    sizem: usize,
    shift: u32,
}

impl Size {
    /// Creates a type for calculating page numbers and byte offsets using a
    /// known granularity.
    ///
    /// # Safety
    ///
    /// The size *must* be a power-of-2, and should be a multiple of the
    /// actual system granularity for the resulting sizes to be valid for
    /// mapping calls.
    #[inline]
    unsafe fn new_size(size: usize) -> Self {
        Self {
            sizem: size - 1,
            shift: size.trailing_zeros(),
        }
    }

    /// Creates a type using the system's page size.
    #[inline]
    pub fn page() -> Self {
        unsafe { Self::new_size(os::page_size()) }
    }

    /// Creates a type using the system's allocation granularity.
    ///
    /// On most platforms this is the same as the page size, but on Windows
    /// it is coarser (typically 64 KiB); ring mappings must be rounded to
    /// this size rather than the page size since `MapViewOfFileEx` requires
    /// the explicit base address to be allocation-granularity aligned.
    #[inline]
    pub fn alloc() -> Self {
        unsafe { Self::new_size(os::allocation_granularity()) }
    }

    /// Round a byte size up to the nearest granularity boundary.
    #[inline]
    pub fn round(&self, len: usize) -> usize {
        self.truncate(len.saturating_add(self.sizem))
    }

    /// Round a byte size down to the nearest granularity boundary.
    #[inline]
    pub fn truncate(&self, len: usize) -> usize {
        len & !self.sizem
    }

    /// Convert a unit count into a byte size.
    #[inline]
    pub fn size(&self, count: usize) -> usize {
        count << self.shift
    }

    /// Convert a byte size into the number of units necessary to contain it.
    #[inline]
    pub fn count(&self, len: usize) -> usize {
        self.round(len) >> self.shift
    }

    /// The granularity, in bytes, represented by this `Size`.
    #[inline]
    pub fn unit(&self) -> usize {
        self.sizem + 1
    }
}

#[cfg(test)]
mod tests {
    use super::Size;

    #[test]
    fn page_round() {
        let info = unsafe { Size::new_size(4096) };
        assert_eq!(info.round(0), 0);
        assert_eq!(info.round(1), 4096);
        assert_eq!(info.round(4095), 4096);
        assert_eq!(info.round(4096), 4096);
        assert_eq!(info.round(4097), 8192);
        assert_eq!(info.truncate(0), 0);
        assert_eq!(info.truncate(1), 0);
        assert_eq!(info.truncate(4095), 0);
        assert_eq!(info.truncate(4096), 4096);
        assert_eq!(info.truncate(4097), 4096);
        assert_eq!(info.size(0), 0);
        assert_eq!(info.size(1), 4096);
        assert_eq!(info.size(2), 8192);
        assert_eq!(info.count(0), 0);
        assert_eq!(info.count(1), 1);
        assert_eq!(info.count(4095), 1);
        assert_eq!(info.count(4096), 1);
        assert_eq!(info.count(4097), 2);
        assert_eq!(info.count(8192), 2);
    }
}
