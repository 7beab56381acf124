//! `Unlink` and `RemoveDir`.

use crate::sys;

use super::{OpResult, Reply, Request};

pub fn run_unlink(req: &mut Request<'_>) -> OpResult {
    sys::unlink(req.path)?;
    Ok(Reply::empty())
}

pub fn run_rmdir(req: &mut Request<'_>) -> OpResult {
    sys::rmdir(req.path)?;
    Ok(Reply::empty())
}
