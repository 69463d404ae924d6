//! Low-level cross-platform virtual memory functions.

use std::sync::OnceLock;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use self::unix::{map_ring, unmap_ring};
#[cfg(unix)]
use self::unix::{query_allocation_granularity, query_page_size};

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use self::windows::{map_ring, unmap_ring};
#[cfg(windows)]
use self::windows::{query_allocation_granularity, query_page_size};

static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
static ALLOC_GRANULARITY: OnceLock<usize> = OnceLock::new();

/// Gets a cached version of the system page size.
///
/// ```
/// let size = ringcoro::os::page_size();
/// println!("the system page size is {} bytes", size);
/// ```
pub fn page_size() -> usize {
    *PAGE_SIZE.get_or_init(query_page_size)
}

/// Gets a cached version of the system's allocation granularity.
///
/// On most platforms this is identical to [`page_size`]. On Windows it is
/// coarser (typically 64 KiB), since `MapViewOfFileEx` requires the caller's
/// requested base address to fall on an allocation-granularity boundary
/// rather than merely a page boundary.
pub fn allocation_granularity() -> usize {
    *ALLOC_GRANULARITY.get_or_init(query_allocation_granularity)
}
