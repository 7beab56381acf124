//! Host syscall wrappers.
//!
//! The executor never touches ambient `errno`: every wrapper performs one
//! libc call and hands back `Result<T, Errno>`, capturing the error value at
//! the call site. All paths are `CStr` because they originate in guest
//! memory, not in Rust strings.

use std::ffi::CStr;
use std::io;
use std::sync::{Mutex, MutexGuard};

use crate::wire::NAME_SLOT_LEN;

/// A raw host errno value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Errno(pub i32);

impl Errno {
    /// Captures the errno of the immediately preceding failed call.
    pub fn last() -> Self {
        Errno(io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO))
    }
}

impl std::fmt::Display for Errno {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0, io::Error::from_raw_os_error(self.0))
    }
}

/// Result of a host syscall with error type [`Errno`].
pub type Result<T> = std::result::Result<T, Errno>;

fn check(rv: libc::c_int) -> Result<libc::c_int> {
    if rv < 0 {
        Err(Errno::last())
    } else {
        Ok(rv)
    }
}

fn check_len(rv: libc::ssize_t) -> Result<usize> {
    if rv < 0 {
        Err(Errno::last())
    } else {
        Ok(rv as usize)
    }
}

pub fn lstat(path: &CStr) -> Result<libc::stat> {
    let mut st = std::mem::MaybeUninit::<libc::stat>::uninit();
    check(unsafe { libc::lstat(path.as_ptr(), st.as_mut_ptr()) })?;
    Ok(unsafe { st.assume_init() })
}

pub fn fstat(fd: i32) -> Result<libc::stat> {
    let mut st = std::mem::MaybeUninit::<libc::stat>::uninit();
    check(unsafe { libc::fstat(fd, st.as_mut_ptr()) })?;
    Ok(unsafe { st.assume_init() })
}

pub fn statvfs(path: &CStr) -> Result<libc::statvfs> {
    let mut st = std::mem::MaybeUninit::<libc::statvfs>::uninit();
    check(unsafe { libc::statvfs(path.as_ptr(), st.as_mut_ptr()) })?;
    Ok(unsafe { st.assume_init() })
}

/// `readlink` into `buf`, returning the number of target bytes. The target
/// is not NUL-terminated by the kernel; the caller appends one.
pub fn readlink(path: &CStr, buf: &mut [u8]) -> Result<usize> {
    check_len(unsafe {
        libc::readlink(path.as_ptr(), buf.as_mut_ptr() as *mut libc::c_char, buf.len())
    })
}

pub fn mkdir(path: &CStr, mode: libc::mode_t) -> Result<()> {
    check(unsafe { libc::mkdir(path.as_ptr(), mode) }).map(drop)
}

pub fn unlink(path: &CStr) -> Result<()> {
    check(unsafe { libc::unlink(path.as_ptr()) }).map(drop)
}

pub fn rmdir(path: &CStr) -> Result<()> {
    check(unsafe { libc::rmdir(path.as_ptr()) }).map(drop)
}

pub fn symlink(target: &CStr, link: &CStr) -> Result<()> {
    check(unsafe { libc::symlink(target.as_ptr(), link.as_ptr()) }).map(drop)
}

pub fn rename(from: &CStr, to: &CStr) -> Result<()> {
    check(unsafe { libc::rename(from.as_ptr(), to.as_ptr()) }).map(drop)
}

pub fn chmod(path: &CStr, mode: libc::mode_t) -> Result<()> {
    check(unsafe { libc::chmod(path.as_ptr(), mode) }).map(drop)
}

pub fn chown(path: &CStr, uid: libc::uid_t, gid: libc::gid_t) -> Result<()> {
    check(unsafe { libc::chown(path.as_ptr(), uid, gid) }).map(drop)
}

pub fn truncate(path: &CStr, length: libc::off_t) -> Result<()> {
    check(unsafe { libc::truncate(path.as_ptr(), length) }).map(drop)
}

pub fn ftruncate(fd: i32, length: libc::off_t) -> Result<()> {
    check(unsafe { libc::ftruncate(fd, length) }).map(drop)
}

pub fn open(path: &CStr, flags: i32) -> Result<i32> {
    check(unsafe { libc::open(path.as_ptr(), flags) })
}

pub fn creat(path: &CStr, mode: libc::mode_t) -> Result<i32> {
    check(unsafe { libc::creat(path.as_ptr(), mode) })
}

pub fn close(fd: i32) -> Result<()> {
    check(unsafe { libc::close(fd) }).map(drop)
}

pub fn pread(fd: i32, buf: &mut [u8], offset: libc::off_t) -> Result<usize> {
    check_len(unsafe {
        libc::pread(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), offset)
    })
}

pub fn pwrite(fd: i32, buf: &[u8], offset: libc::off_t) -> Result<usize> {
    check_len(unsafe {
        libc::pwrite(fd, buf.as_ptr() as *const libc::c_void, buf.len(), offset)
    })
}

pub fn fsync(fd: i32) -> Result<()> {
    check(unsafe { libc::fsync(fd) }).map(drop)
}

pub fn fdatasync(fd: i32) -> Result<()> {
    check(unsafe { libc::fdatasync(fd) }).map(drop)
}

pub fn access(path: &CStr, mask: i32) -> Result<()> {
    check(unsafe { libc::access(path.as_ptr(), mask) }).map(drop)
}

/// `lsetxattr`; operates on the link itself for symlinks.
pub fn lsetxattr(path: &CStr, name: &CStr, value: &[u8], flags: i32) -> Result<()> {
    check(unsafe {
        libc::lsetxattr(
            path.as_ptr(),
            name.as_ptr(),
            value.as_ptr() as *const libc::c_void,
            value.len(),
            flags,
        )
    })
    .map(drop)
}

/// `lgetxattr` into `buf`, returning the value length. An empty `buf` probes
/// the required size without copying.
pub fn lgetxattr(path: &CStr, name: &CStr, buf: &mut [u8]) -> Result<usize> {
    check_len(unsafe {
        libc::lgetxattr(
            path.as_ptr(),
            name.as_ptr(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
        )
    })
}

/// `llistxattr` into `buf`, returning the list length. An empty `buf` probes
/// the required size without copying.
pub fn llistxattr(path: &CStr, buf: &mut [u8]) -> Result<usize> {
    check_len(unsafe {
        libc::llistxattr(path.as_ptr(), buf.as_mut_ptr() as *mut libc::c_char, buf.len())
    })
}

pub fn lremovexattr(path: &CStr, name: &CStr) -> Result<()> {
    check(unsafe { libc::lremovexattr(path.as_ptr(), name.as_ptr()) }).map(drop)
}

/// Enumerates a directory in `readdir` order, one fixed-width name slot per
/// entry (`.` and `..` included when the host returns them). The directory
/// stream is opened and closed within the call so no host state outlives it.
pub fn read_dir(path: &CStr) -> Result<Vec<[u8; NAME_SLOT_LEN]>> {
    let dirp = unsafe { libc::opendir(path.as_ptr()) };
    if dirp.is_null() {
        return Err(Errno::last());
    }

    let mut slots = Vec::new();
    loop {
        // readdir reports end-of-stream and failure the same way; only a
        // changed errno tells them apart.
        unsafe { *libc::__errno_location() = 0 };
        let entry = unsafe { libc::readdir(dirp) };
        if entry.is_null() {
            let err = Errno::last();
            unsafe { libc::closedir(dirp) };
            if err.0 == 0 {
                return Ok(slots);
            }
            return Err(err);
        }

        let mut slot = [0u8; NAME_SLOT_LEN];
        let name = unsafe { &(*entry).d_name };
        for (dst, src) in slot.iter_mut().zip(name.iter()) {
            *dst = *src as u8;
            if *src == 0 {
                break;
            }
        }
        slots.push(slot);
    }
}

/// The umask is process-global; interleaved save/clear/restore sequences
/// from concurrent dispatches would restore each other's masks mid-syscall.
static UMASK_LOCK: Mutex<()> = Mutex::new(());

/// Clears the process umask for the duration of the guard so permission
/// arguments apply exactly as given, restoring the saved mask on drop.
/// Holds [`UMASK_LOCK`] for its whole lifetime.
pub struct UmaskGuard {
    saved: libc::mode_t,
    _lock: MutexGuard<'static, ()>,
}

impl UmaskGuard {
    pub fn clear() -> Self {
        let lock = UMASK_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        UmaskGuard { saved: unsafe { libc::umask(0) }, _lock: lock }
    }
}

impl Drop for UmaskGuard {
    fn drop(&mut self) {
        unsafe { libc::umask(self.saved) };
    }
}
