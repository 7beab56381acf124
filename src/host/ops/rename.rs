//! `Rename`.

use crate::sys;

use super::{OpResult, Reply, Request};

/// The envelope path is the source; the input record carries the
/// destination path.
pub fn run(req: &mut Request<'_>) -> OpResult {
    let to = req.input_cstring()?;
    sys::rename(req.path, &to)?;
    Ok(Reply::empty())
}
