//! `TypeProbe`: the mount-time layout handshake.

use tracing::warn;

use crate::sys::Errno;
use crate::wire::probe::TypeProbeArgs;

use super::{OpError, OpResult, Reply, Request};

/// Compares every size the guest reported against this side's own. Any
/// difference fails the mount with `EPROTO`; each offending field is named
/// in the log, which is where a layout bug has to be chased anyway.
pub fn run(req: &mut Request<'_>) -> OpResult {
    if req.envelope.payload_size as usize != TypeProbeArgs::SIZE {
        warn!(
            reported = req.envelope.payload_size,
            expected = TypeProbeArgs::SIZE,
            "type probe record has the wrong size"
        );
        return Err(OpError::Sys(Errno(libc::EPROTO)));
    }

    let reported = TypeProbeArgs::decode(&mut req.input_cursor()?)?;
    let mismatches = reported.mismatches();
    if mismatches.is_empty() {
        return Ok(Reply::empty());
    }
    for field in mismatches {
        warn!(field, "guest and host disagree on a wire type size");
    }
    Err(OpError::Sys(Errno(libc::EPROTO)))
}
