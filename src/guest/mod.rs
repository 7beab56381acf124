//! The guest-side half of the bridge: what the in-guest filesystem driver
//! links against.
//!
//! The driver environment supplies a [`GuestPort`] — its own address space
//! plus the simulator's trapped pseudo-instruction — and gets back a typed
//! POSIX surface ([`fs::PassthroughFs`]) whose every method runs the
//! envelope/fetch dance of the transfer protocol.

pub mod call;
pub mod fs;
pub mod mount;

pub use fs::PassthroughFs;
pub use mount::{mount, MountError};

use crate::bridge::GuestAddr;

/// The driver's view of its own environment: buffer management in guest
/// memory and the hypercall instruction.
///
/// `alloc` must hand back memory whose pages are present; callers zero new
/// buffers before passing them to the host, which doubles as the
/// page-touching the simulator's address translation needs.
pub trait GuestPort {
    /// Allocates `len` bytes of guest memory; `None` reports exhaustion.
    fn alloc(&mut self, len: usize) -> Option<GuestAddr>;

    /// Returns a buffer obtained from [`GuestPort::alloc`].
    fn free(&mut self, addr: GuestAddr, len: usize);

    /// Writes into the guest's own memory.
    fn write(&mut self, addr: GuestAddr, bytes: &[u8]);

    /// Reads from the guest's own memory.
    fn read(&self, addr: GuestAddr, len: usize) -> Vec<u8>;

    /// Issues the trapped pseudo-instruction with the three operand
    /// addresses `(input, request, result)`.
    fn hypercall(&mut self, input: GuestAddr, request: GuestAddr, result: GuestAddr) -> u64;
}
