//! `GetAttr` and `FGetAttr`: file metadata by path or by descriptor.

use crate::host::reply::ReplyPayload;
use crate::sys;
use crate::wire::ops::decode_int;

use super::{OpResult, Reply, Request};

/// `lstat`, so a symlink reports its own metadata rather than its target's.
pub fn run(req: &mut Request<'_>) -> OpResult {
    let st = sys::lstat(req.path)?;
    Ok(Reply::with(ReplyPayload::Stat(Box::new(st))))
}

/// `fstat` on a host descriptor previously returned by `Open`/`Create`.
pub fn run_fd(req: &mut Request<'_>) -> OpResult {
    let fd = decode_int(&mut req.input_cursor()?)?;
    let st = sys::fstat(fd)?;
    Ok(Reply::with(ReplyPayload::Stat(Box::new(st))))
}
