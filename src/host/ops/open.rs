//! `Open`, `Create` and `Release`: host descriptor lifecycle.
//!
//! Descriptors belong to the host process; the guest refers to them by
//! integer and is responsible for pairing every `Open`/`Create` with a
//! `Release`. The host never reclaims them on its own.

use crate::host::reply::ReplyPayload;
use crate::sys;
use crate::wire::ops::{decode_int, decode_mode};

use super::{OpResult, Reply, Request};

pub fn run(req: &mut Request<'_>) -> OpResult {
    let flags = decode_int(&mut req.input_cursor()?)?;
    let fd = sys::open(req.path, flags)?;
    Ok(Reply::with(ReplyPayload::Fd(fd)))
}

pub fn run_create(req: &mut Request<'_>) -> OpResult {
    let mode = decode_mode(&mut req.input_cursor()?)?;
    let fd = sys::creat(req.path, mode as libc::mode_t)?;
    Ok(Reply::with(ReplyPayload::Fd(fd)))
}

pub fn run_release(req: &mut Request<'_>) -> OpResult {
    let fd = decode_int(&mut req.input_cursor()?)?;
    sys::close(fd)?;
    Ok(Reply::empty())
}
