//! `ReadLink`: resolve a symlink's target into a guest-sized buffer.

use crate::host::reply::ReplyPayload;
use crate::sys;
use crate::wire::ops::decode_size;

use super::{OpError, OpResult, Reply, Request};

/// The input is the guest's buffer size; the target is read into one byte
/// less and NUL-terminated, since the kernel does not terminate it.
pub fn run(req: &mut Request<'_>) -> OpResult {
    let buf_size = decode_size(&mut req.input_cursor()?)? as usize;
    if buf_size == 0 {
        return Err(OpError::Malformed);
    }

    let mut target = vec![0u8; buf_size];
    let len = sys::readlink(req.path, &mut target[..buf_size - 1])?;
    target[len] = 0;
    target.truncate(len + 1);

    Ok(Reply::with(ReplyPayload::Bytes(target)))
}
