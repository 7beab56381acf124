//! An in-process simulator: a flat guest address space wired straight to a
//! [`HostExecutor`].
//!
//! This is how the protocol is exercised byte-for-byte without a CPU
//! simulator in the loop — the demo binary and the integration tests mount
//! through it, and a simulator integration can use it as a reference for
//! the thread-context contract.

use crate::bridge::{BridgeFault, GuestAddr, GuestMemory};
use crate::config::Config;
use crate::guest::GuestPort;
use crate::host::HostExecutor;

/// Lowest mapped guest address; keeps null distinguishable from real
/// buffers.
const RAM_BASE: u64 = 0x1000;

/// A bump-allocated flat memory standing in for the guest's address space.
/// Frees are accepted and ignored; harness lifetimes are short.
pub struct GuestRam {
    bytes: Vec<u8>,
    next: usize,
}

impl GuestRam {
    pub fn new(capacity: usize) -> Self {
        GuestRam { bytes: vec![0; capacity], next: 0 }
    }

    pub fn alloc(&mut self, len: usize) -> Option<GuestAddr> {
        // Zero-length buffers still get a distinct, valid address.
        let reserved = len.max(1);
        if reserved > self.bytes.len().saturating_sub(self.next) {
            return None;
        }
        let addr = GuestAddr(RAM_BASE + self.next as u64);
        self.next += reserved;
        Some(addr)
    }

    fn range(&self, addr: GuestAddr, len: usize) -> Option<std::ops::Range<usize>> {
        let start = addr.0.checked_sub(RAM_BASE)? as usize;
        let end = start.checked_add(len)?;
        if end > self.bytes.len() {
            return None;
        }
        Some(start..end)
    }
}

impl GuestMemory for GuestRam {
    fn copy_out(&self, src: GuestAddr, dst: &mut [u8]) -> Result<(), BridgeFault> {
        if dst.is_empty() {
            return Ok(());
        }
        let range = self
            .range(src, dst.len())
            .ok_or(BridgeFault { addr: src, len: dst.len() })?;
        dst.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn copy_in(&mut self, dst: GuestAddr, src: &[u8]) -> Result<(), BridgeFault> {
        if src.is_empty() {
            return Ok(());
        }
        let range = self
            .range(dst, src.len())
            .ok_or(BridgeFault { addr: dst, len: src.len() })?;
        self.bytes[range].copy_from_slice(src);
        Ok(())
    }
}

/// A guest and its host executor fused into one object. Implements
/// [`GuestPort`], so it can be mounted like a real driver environment.
pub struct LoopbackSim {
    ram: GuestRam,
    host: HostExecutor,
}

impl LoopbackSim {
    /// Sixteen MiB of guest RAM and a default executor configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_ram(16 << 20, config)
    }

    /// An explicitly sized guest RAM; small capacities exercise the
    /// guest-side allocation-failure paths.
    pub fn with_ram(capacity: usize, config: Config) -> Self {
        LoopbackSim { ram: GuestRam::new(capacity), host: HostExecutor::new(config) }
    }

    /// The executor, for host-side assertions (pending replies and the
    /// like).
    pub fn host(&self) -> &HostExecutor {
        &self.host
    }
}

impl Default for LoopbackSim {
    fn default() -> Self {
        Self::new()
    }
}

impl GuestPort for LoopbackSim {
    fn alloc(&mut self, len: usize) -> Option<GuestAddr> {
        self.ram.alloc(len)
    }

    fn free(&mut self, _addr: GuestAddr, _len: usize) {}

    fn write(&mut self, addr: GuestAddr, bytes: &[u8]) {
        self.ram.copy_in(addr, bytes).expect("guest writes stay inside its own RAM");
    }

    fn read(&self, addr: GuestAddr, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.ram.copy_out(addr, &mut buf).expect("guest reads stay inside its own RAM");
        buf
    }

    fn hypercall(&mut self, input: GuestAddr, request: GuestAddr, result: GuestAddr) -> u64 {
        self.host.process_request(&mut self.ram, input, request, result)
    }
}
