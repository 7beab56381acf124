//! `MakeDir`.

use crate::sys;
use crate::wire::ops::decode_mode;

use super::{OpResult, Reply, Request};

/// The umask is cleared for the whole dispatch, so the directory gets
/// exactly the requested mode bits.
pub fn run(req: &mut Request<'_>) -> OpResult {
    let mode = decode_mode(&mut req.input_cursor()?)?;
    sys::mkdir(req.path, mode as libc::mode_t)?;
    Ok(Reply::empty())
}
