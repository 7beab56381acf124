//! `MakeSymlink`.

use crate::sys;

use super::{OpResult, Reply, Request};

/// The envelope path is the link target; the input record carries the path
/// of the link to create.
pub fn run(req: &mut Request<'_>) -> OpResult {
    let link = req.input_cstring()?;
    sys::symlink(req.path, &link)?;
    Ok(Reply::empty())
}
