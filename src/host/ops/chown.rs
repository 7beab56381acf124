//! `ChangeOwner`.

use crate::sys;
use crate::wire::ops::ChownArgs;

use super::{OpResult, Reply, Request};

pub fn run(req: &mut Request<'_>) -> OpResult {
    let args = ChownArgs::decode(&mut req.input_cursor()?)?;
    sys::chown(req.path, args.uid, args.gid)?;
    Ok(Reply::empty())
}
