//! The doubled virtual-memory mapping backing a ring buffer.

use std::fmt;
use std::ptr;

use crate::error::{Error, Input, Operation, Result};
use crate::os;
use crate::size::Size;

/// Number of times [`LinearMap::new`] will retry the map-then-verify cycle
/// before giving up. Each retry picks an entirely new address range, so this
/// only guards against a transient race between the probe and the fixed
/// remap, not a systemic platform failure.
const MAX_ALIAS_ATTEMPTS: usize = 8;

/// An anonymous allocation of `len` bytes mapped twice into adjacent virtual
/// addresses, so that the byte range `[0, 2*len)` all refers to the same
/// `len` bytes of physical memory.
///
/// This is the magic trick that lets a ring buffer hand out a single
/// contiguous slice for any in-bounds span, even one that wraps past the
/// nominal end of the buffer.
pub struct LinearMap {
    ptr: *mut u8,
    len: usize,
}

unsafe impl Send for LinearMap {}
unsafe impl Sync for LinearMap {}

impl LinearMap {
    /// Allocates a new doubled mapping of at least `min_len` bytes.
    ///
    /// The requested length is rounded up to the system's allocation
    /// granularity (see [`Size::alloc`]). A zero-length or overflowing
    /// request is rejected before any system call is made.
    pub fn new(min_len: usize) -> Result<Self> {
        if min_len == 0 {
            return Err(Error::input(Operation::RingAllocate, Input::InvalidRange));
        }

        let unit = Size::alloc();
        let len = unit.round(min_len);
        if len == 0 || len > isize::MAX as usize / 2 {
            return Err(Error::input(Operation::RingAllocate, Input::InvalidRange));
        }

        let mut last_err = None;
        for _ in 0..MAX_ALIAS_ATTEMPTS {
            let ptr = unsafe { os::map_ring(len)? };
            match unsafe { verify_alias(ptr, len) } {
                Ok(()) => return Ok(Self { ptr, len }),
                Err(err) => {
                    unsafe {
                        os::unmap_ring(ptr, len).unwrap_or_default();
                    }
                    last_err = Some(err);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| Error::input(Operation::RingAlias, Input::AliasingNotEstablished)))
    }

    /// The usable capacity of the mapping, i.e. half of its virtual span.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// A pointer to the first of the two aliased copies.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// A mutable pointer to the first of the two aliased copies.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr
    }
}

impl Drop for LinearMap {
    fn drop(&mut self) {
        unsafe { os::unmap_ring(self.ptr, self.len) }.unwrap_or_default();
    }
}

impl fmt::Debug for LinearMap {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("LinearMap")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Confirms that a byte written at the mapping's head is visible at its
/// tail alias, and vice versa, guarding against a probe-then-remap race
/// handing back a region that another allocation claimed in between.
unsafe fn verify_alias(ptr: *mut u8, len: usize) -> Result<()> {
    let head = ptr;
    let tail = ptr.add(len);

    let saved_head = ptr::read_volatile(head);
    let saved_tail = ptr::read_volatile(tail);

    ptr::write_volatile(head, saved_head.wrapping_add(1));
    let seen_at_tail = ptr::read_volatile(tail);
    ptr::write_volatile(head, saved_head);
    if seen_at_tail != saved_head.wrapping_add(1) {
        return Err(Error::input(Operation::RingAlias, Input::AliasingNotEstablished));
    }

    ptr::write_volatile(tail, saved_tail.wrapping_add(1));
    let seen_at_head = ptr::read_volatile(head);
    ptr::write_volatile(tail, saved_tail);
    if seen_at_head != saved_tail.wrapping_add(1) {
        return Err(Error::input(Operation::RingAlias, Input::AliasingNotEstablished));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::LinearMap;

    #[test]
    fn rounds_up_and_aliases() {
        let map = LinearMap::new(1).expect("failed to create mapping");
        assert!(map.len() > 0);
        unsafe {
            let head = map.as_ptr() as *mut u8;
            *head = 0x42;
            assert_eq!(*head.add(map.len()), 0x42);
        }
    }

    #[test]
    fn rejects_zero_length() {
        assert!(LinearMap::new(0).is_err());
    }
}
