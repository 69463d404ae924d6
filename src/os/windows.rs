extern crate winapi;

use std::mem;
use std::ptr;

use winapi::shared::minwindef::DWORD;
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::memoryapi::{
    MapViewOfFileEx, UnmapViewOfFile, VirtualAlloc, VirtualFree, FILE_MAP_READ, FILE_MAP_WRITE,
};
use winapi::um::sysinfoapi::{GetSystemInfo, SYSTEM_INFO};
use winapi::um::winbase::CreateFileMappingA;
use winapi::um::winnt::{MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE};

use crate::error::{Error, Operation, Result};

/// Requests the page size from the system.
pub fn query_page_size() -> usize {
    system_info().dwPageSize as usize
}

/// Requests the allocation granularity from the system.
///
/// `MapViewOfFileEx` requires its caller-supplied base address to land on
/// this boundary, which on Windows is typically 64 KiB and coarser than the
/// page size.
pub fn query_allocation_granularity() -> usize {
    system_info().dwAllocationGranularity as usize
}

fn system_info() -> SYSTEM_INFO {
    unsafe {
        let mut info: SYSTEM_INFO = mem::zeroed();
        GetSystemInfo(&mut info);
        info
    }
}

/// Reserves and immediately releases an address range of `size` bytes,
/// returning a base address the caller can race to reclaim with fixed
/// mappings. This mirrors the POSIX technique of an anonymous probe mapping
/// later overlaid with `MAP_FIXED`; the caller must retry on failure since
/// another allocation may win the race for the address.
fn probe_base(size: usize) -> Result<*mut u8> {
    let addr = unsafe { VirtualAlloc(ptr::null_mut(), size, MEM_RESERVE, PAGE_NOACCESS) };
    if addr.is_null() {
        return Err(Error::last_os_error(Operation::RingAllocate));
    }
    unsafe {
        VirtualFree(addr, 0, MEM_RELEASE);
    }
    Ok(addr as *mut u8)
}

/// Creates an anonymous circular allocation.
///
/// The length is the size of the sequential range, and the offset of
/// `len+1` refers to the same memory location at offset `0`. The circle
/// continues up through the offset of `2*len - 1`.
pub unsafe fn map_ring(len: usize) -> Result<*mut u8> {
    let full = (len * 2) as u64;
    let mapping = CreateFileMappingA(
        INVALID_HANDLE_VALUE,
        ptr::null_mut(),
        PAGE_READWRITE,
        (full >> 32) as DWORD,
        (full & 0xffff_ffff) as DWORD,
        ptr::null(),
    );
    if mapping.is_null() {
        return Err(Error::last_os_error(Operation::RingEntry));
    }

    let result = map_two_views(mapping, len);
    CloseHandle(mapping);
    result
}

unsafe fn map_two_views(mapping: *mut winapi::ctypes::c_void, len: usize) -> Result<*mut u8> {
    let base = probe_base(len * 2)?;

    let a = MapViewOfFileEx(
        mapping,
        FILE_MAP_READ | FILE_MAP_WRITE,
        0,
        0,
        len,
        base as *mut _,
    );
    if a.is_null() {
        return Err(Error::last_os_error(Operation::RingPrimary));
    }

    let b = MapViewOfFileEx(
        mapping,
        FILE_MAP_READ | FILE_MAP_WRITE,
        0,
        0,
        len,
        base.add(len) as *mut _,
    );
    if b.is_null() {
        let err = Error::last_os_error(Operation::RingSecondary);
        UnmapViewOfFile(a);
        return Err(err);
    }

    Ok(base)
}

/// Unmaps a ring mapping created by `map_ring`.
pub unsafe fn unmap_ring(pg: *mut u8, len: usize) -> Result<()> {
    if UnmapViewOfFile(pg as *mut _) == 0 {
        return Err(Error::last_os_error(Operation::RingDeallocate));
    }
    if UnmapViewOfFile(pg.add(len) as *mut _) == 0 {
        return Err(Error::last_os_error(Operation::RingDeallocate));
    }
    Ok(())
}
