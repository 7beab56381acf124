//! `Write`: positioned write of guest bytes to an open host descriptor.

use crate::bridge::{self, GuestAddr};
use crate::host::reply::ReplyPayload;
use crate::sys;
use crate::wire::ops::ReadWriteArgs;

use super::{OpResult, Reply, Request};

/// Copies the data out of guest memory, then `pwrite`s it at the supplied
/// offset. The file-position cursor is never advanced, and `O_APPEND`
/// positioning is the guest driver's concern.
pub fn run(req: &mut Request<'_>) -> OpResult {
    let args = ReadWriteArgs::decode(&mut req.input_cursor()?)?;
    let data = bridge::read_bytes(&*req.mem, GuestAddr(args.data_ptr), args.size as usize)?;
    let written = sys::pwrite(args.fd, &data, args.offset)?;
    Ok(Reply::with(ReplyPayload::Written(written as i64)))
}
