//! `StatFs`: filesystem statistics for the tree containing `path`.

use crate::host::reply::ReplyPayload;
use crate::sys;

use super::{OpResult, Reply, Request};

pub fn run(req: &mut Request<'_>) -> OpResult {
    let st = sys::statvfs(req.path)?;
    Ok(Reply::with(ReplyPayload::StatVfs(Box::new(st))))
}
