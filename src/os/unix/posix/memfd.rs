extern crate libc;

use std::io::{Error, Result};
use std::os::raw::c_int;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn memfd_open() -> Result<c_int> {
    use std::os::raw::c_char;
    const NAME: &[u8] = b"ringcoro\0";
    let fd = unsafe {
        libc::syscall(
            libc::SYS_memfd_create,
            NAME.as_ptr() as *const c_char,
            libc::MFD_CLOEXEC,
        )
    };
    if fd < 0 {
        Err(Error::last_os_error())
    } else {
        Ok(fd as c_int)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn memfd_open() -> Result<c_int> {
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OFLAGS: c_int = libc::O_RDWR | libc::O_CREAT | libc::O_EXCL | libc::O_CLOEXEC;
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    // Build a unique shm path from the process id and a process-local
    // counter; a dedicated random crate is unneeded since the name only
    // has to avoid collisions with this process's own prior attempts.
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = unsafe { libc::getpid() };
    let name = format!("/ringcoro-{}-{}\0", pid, seq);

    let fd = unsafe { libc::shm_open(name.as_ptr() as *const _, OFLAGS, 0o600) };
    if fd < 0 {
        Err(Error::last_os_error())
    } else {
        unsafe { libc::shm_unlink(name.as_ptr() as *const _) };
        Ok(fd)
    }
}
