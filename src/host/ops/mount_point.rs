//! `SetMountpoint` and `GetMountpoint`: process-lifetime mount bookkeeping.

use crate::host::reply::ReplyPayload;

use super::{OpResult, Reply, Request};

/// Records the guest mount point (the input record, NUL-terminated) and the
/// host-side root it shadows (the envelope path; `/` when the guest sends
/// none). Written once at mount time; later requests carry absolute paths
/// and never consult this state.
pub fn run_set(req: &mut Request<'_>) -> OpResult {
    let mountpoint = req.input_cstring()?;
    let mut state = req.mount.write().expect("mount state lock");
    state.guest_mountpoint = mountpoint.into_bytes();
    state.host_root = req.path.to_bytes().to_vec();
    Ok(Reply::empty())
}

/// Replies with the recorded guest mount-point bytes.
pub fn run_get(req: &mut Request<'_>) -> OpResult {
    let state = req.mount.read().expect("mount state lock");
    if state.guest_mountpoint.is_empty() {
        return Ok(Reply::empty());
    }
    Ok(Reply::with(ReplyPayload::Bytes(state.guest_mountpoint.clone())))
}
