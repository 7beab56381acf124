//! `Read`: positioned read from an open host descriptor.

use crate::host::reply::ReplyPayload;
use crate::sys;
use crate::wire::ops::ReadWriteArgs;

use super::{OpResult, Reply, Request};

/// `pread` at the supplied offset; the reply carries exactly the bytes the
/// host returned, which may be fewer than requested.
pub fn run(req: &mut Request<'_>) -> OpResult {
    let args = ReadWriteArgs::decode(&mut req.input_cursor()?)?;
    let mut buf = vec![0u8; args.size as usize];
    let len = sys::pread(args.fd, &mut buf, args.offset)?;
    buf.truncate(len);
    Ok(Reply::with(ReplyPayload::Bytes(buf)))
}
