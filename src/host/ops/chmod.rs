//! `ChangePermission`.

use crate::sys;
use crate::wire::ops::decode_mode;

use super::{OpResult, Reply, Request};

pub fn run(req: &mut Request<'_>) -> OpResult {
    let mode = decode_mode(&mut req.input_cursor()?)?;
    sys::chmod(req.path, mode as libc::mode_t)?;
    Ok(Reply::empty())
}
