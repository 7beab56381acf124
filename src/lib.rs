//! simfs - a guest-to-host passthrough filesystem bridge for full-system
//! CPU simulators.
//!
//! A driver inside the simulated guest exposes a mount point whose contents
//! are real files of the machine running the simulator. Each file operation
//! becomes a fixed-layout request envelope plus an operation record in
//! guest memory; a trapped pseudo-instruction hands three guest addresses
//! to the [`host::HostExecutor`], which runs the matching syscall on the
//! host and answers through a two-stage reply: first a size hint with an
//! opaque fetch handle, then - once the guest has allocated a buffer of
//! that size - the payload itself.
//!
//! The crate splits along the boundary the protocol crosses: [`wire`] holds
//! the shared record layouts, [`bridge`] the guest-memory access seam,
//! [`host`] the executor, [`guest`] the driver-side client, and
//! [`loopback`] an in-process simulator that fuses both halves for tests
//! and demos.

pub mod bridge;
pub mod config;
pub mod guest;
pub mod host;
pub mod loopback;
pub mod sys;
pub mod wire;
