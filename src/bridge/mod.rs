//! Primitives for moving bytes across the guest/host address-space boundary.
//!
//! The simulator hands the executor a thread context that can translate
//! guest virtual addresses through the guest's page tables; [`GuestMemory`]
//! is that seam. Everything above it deals in plain byte slices.

use std::ffi::CString;

use crate::wire::Envelope;

/// A guest virtual address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GuestAddr(pub u64);

impl GuestAddr {
    /// Null address; used where an operand carries no payload.
    pub const NULL: GuestAddr = GuestAddr(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn offset(self, bytes: u64) -> GuestAddr {
        GuestAddr(self.0 + bytes)
    }
}

/// Failure to translate a guest address range. Fatal to the current
/// operation; the executor reports it as `EFAULT`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BridgeFault {
    pub addr: GuestAddr,
    pub len: usize,
}

/// Result of a boundary crossing with error type [`BridgeFault`].
pub type Result<T> = std::result::Result<T, BridgeFault>;

/// Simulator-provided view of one guest thread's address space.
pub trait GuestMemory {
    /// Copies `dst.len()` bytes out of guest memory at `src`.
    fn copy_out(&self, src: GuestAddr, dst: &mut [u8]) -> Result<()>;

    /// Copies `src` into guest memory at `dst`.
    fn copy_in(&mut self, dst: GuestAddr, src: &[u8]) -> Result<()>;
}

/// Reads `len` bytes of guest memory into a fresh buffer.
pub fn read_bytes(mem: &dyn GuestMemory, src: GuestAddr, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    mem.copy_out(src, &mut buf)?;
    Ok(buf)
}

/// Extracts the request's path string.
///
/// The guest places a NUL right after `path_len` bytes of path; both are
/// copied so a malformed guest string is cut at the first NUL rather than
/// trusted. A zero `path_len` stands for the filesystem root.
pub fn read_path(mem: &dyn GuestMemory, envelope: &Envelope) -> Result<CString> {
    if envelope.path_len == 0 {
        return Ok(CString::new("/").expect("static path has no NUL"));
    }
    let raw = read_bytes(mem, GuestAddr(envelope.path_ptr), envelope.path_len as usize + 1)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(CString::new(&raw[..end]).expect("bytes are cut at the first NUL"))
}

/// Reads a NUL-terminated string of `len` bytes (NUL excluded) from guest
/// memory. Used for xattr names, symlink targets and rename destinations.
pub fn read_cstring(mem: &dyn GuestMemory, src: GuestAddr, len: usize) -> Result<CString> {
    let raw = read_bytes(mem, src, len + 1)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(CString::new(&raw[..end]).expect("bytes are cut at the first NUL"))
}
