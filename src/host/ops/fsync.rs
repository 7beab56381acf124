//! `Fsync`: flush an open descriptor to stable storage.

use crate::sys;
use crate::wire::ops::SyncArgs;

use super::{OpResult, Reply, Request};

/// A nonzero `datasync` flag skips the metadata flush.
pub fn run(req: &mut Request<'_>) -> OpResult {
    let args = SyncArgs::decode(&mut req.input_cursor()?)?;
    if args.datasync != 0 {
        sys::fdatasync(args.fd)?;
    } else {
        sys::fsync(args.fd)?;
    }
    Ok(Reply::empty())
}
