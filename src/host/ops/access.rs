//! `Access`: permission check with the simulator's own credentials.

use crate::sys;
use crate::wire::ops::decode_int;

use super::{OpResult, Reply, Request};

pub fn run(req: &mut Request<'_>) -> OpResult {
    let mask = decode_int(&mut req.input_cursor()?)?;
    sys::access(req.path, mask)?;
    Ok(Reply::empty())
}
