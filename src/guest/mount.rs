//! The mount-time handshake.

use std::fmt;

use tracing::{debug, warn};

use crate::sys::Errno;
use crate::wire::probe::TypeProbeArgs;
use crate::wire::Operation;

use super::fs::PassthroughFs;
use super::{call, GuestPort};

/// Why a mount attempt was aborted.
#[derive(Debug)]
pub enum MountError {
    /// The host rejected or never answered `SetMountpoint`.
    SetMountpoint(Errno),
    /// The type-size handshake failed. With `EPROTO` the two sides disagree
    /// on a wire type width; the simulator log names each offending field.
    TypeProbe(Errno),
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::SetMountpoint(errno) => {
                write!(f, "host rejected the mount point: {errno}")
            }
            MountError::TypeProbe(errno) if errno.0 == libc::EPROTO => {
                write!(
                    f,
                    "wire type sizes disagree with the host; \
                     the simulator log names each mismatching field"
                )
            }
            MountError::TypeProbe(errno) => write!(f, "type probe failed: {errno}"),
        }
    }
}

/// Performs the mount handshake and returns the ready filesystem surface.
///
/// The mount point is canonicalized when it resolves in the driver's
/// environment (it names a guest path, so it may not exist where tests run
/// this code), registered with the host via `SetMountpoint`, and the wire
/// layout is verified with a `TypeProbe` built from local sizes. Any probe
/// mismatch aborts the mount; there is no degraded mode.
pub fn mount<P: GuestPort>(mut port: P, mountpoint: &str) -> Result<PassthroughFs<P>, MountError> {
    let resolved = std::fs::canonicalize(mountpoint)
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|_| mountpoint.to_owned());

    let mut registration = Vec::with_capacity(resolved.len() + 1);
    registration.extend_from_slice(resolved.as_bytes());
    registration.push(0);
    call::submit(&mut port, Operation::SetMountpoint, "", &registration)
        .map_err(MountError::SetMountpoint)?;
    debug!(mountpoint = %resolved, "mount point registered");

    let probe = TypeProbeArgs::local();
    let mut encoded = Vec::with_capacity(TypeProbeArgs::SIZE);
    probe.encode(&mut encoded).map_err(|_| MountError::TypeProbe(Errno(libc::EIO)))?;
    if let Err(errno) = call::submit(&mut port, Operation::TypeProbe, "", &encoded) {
        warn!(%errno, "type probe rejected; aborting mount");
        return Err(MountError::TypeProbe(errno));
    }
    debug!("type probe accepted");

    Ok(PassthroughFs::new(port, resolved))
}
