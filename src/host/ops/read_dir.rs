//! `ReadDir`: enumerate a directory into fixed-width name slots.

use crate::host::reply::ReplyPayload;
use crate::sys;
use crate::wire::NAME_SLOT_LEN;

use super::{OpResult, Reply, Request};

/// Entries arrive in `readdir` order, `.` and `..` included when the host
/// returns them. Each name occupies one NUL-padded 256-byte slot, so the
/// payload size is always a multiple of the slot width and the slot count
/// equals the entry count. An empty enumeration replies with no payload.
pub fn run(req: &mut Request<'_>) -> OpResult {
    let slots = sys::read_dir(req.path)?;

    let mut listing = Vec::with_capacity(slots.len() * NAME_SLOT_LEN);
    for slot in &slots {
        listing.extend_from_slice(slot);
    }
    if listing.is_empty() {
        return Ok(Reply::empty());
    }
    Ok(Reply::with(ReplyPayload::DirListing(listing)))
}
