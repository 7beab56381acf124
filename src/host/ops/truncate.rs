//! `Truncate` and `Ftruncate`.

use crate::sys;
use crate::wire::ops::{decode_offset, FtruncateArgs};

use super::{OpResult, Reply, Request};

pub fn run(req: &mut Request<'_>) -> OpResult {
    let length = decode_offset(&mut req.input_cursor()?)?;
    sys::truncate(req.path, length)?;
    Ok(Reply::empty())
}

pub fn run_fd(req: &mut Request<'_>) -> OpResult {
    let args = FtruncateArgs::decode(&mut req.input_cursor()?)?;
    sys::ftruncate(args.fd, args.length)?;
    Ok(Reply::empty())
}
