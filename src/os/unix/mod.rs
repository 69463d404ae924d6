//! POSIX and Mach-VM backed ring mapping.

use libc::{sysconf, _SC_PAGESIZE};

// For macOS and iOS we use the mach vm system for rings. The posix module
// does work correctly on these targets, but it necessitates an otherwise
// unneeded file descriptor.
#[cfg(any(target_os = "macos", target_os = "ios"))]
mod macos;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use self::macos::{map_ring, unmap_ring};

// For non-mach targets load the POSIX version of the ring mapping functions.
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
mod posix;
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub use self::posix::{map_ring, unmap_ring};

pub fn query_page_size() -> usize {
    unsafe { sysconf(_SC_PAGESIZE) as usize }
}

/// POSIX has no notion of an allocation granularity distinct from the page
/// size; `mmap` accepts any page-aligned address.
pub fn query_allocation_granularity() -> usize {
    query_page_size()
}
