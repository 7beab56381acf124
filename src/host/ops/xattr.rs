//! The four extended-attribute operations.
//!
//! All use the `l*xattr` family, so a symlink's own attributes are the
//! target, never the linked file's. `GetXAttr` and `ListXAttr` bypass the
//! two-stage protocol: the value lands directly in the guest buffer named
//! by the input record, and the reply only advertises the length.

use crate::bridge::{self, GuestAddr};
use crate::sys;
use crate::wire::ops::XAttrArgs;

use super::{OpResult, Reply, Request};

pub fn run_set(req: &mut Request<'_>) -> OpResult {
    let args = XAttrArgs::decode(&mut req.input_cursor()?)?;
    let name = bridge::read_cstring(&*req.mem, GuestAddr(args.name_ptr), args.name_size as usize)?;
    let value = bridge::read_bytes(&*req.mem, GuestAddr(args.value_ptr), args.value_size as usize)?;
    sys::lsetxattr(req.path, &name, &value, args.flags)?;
    Ok(Reply::empty())
}

/// With a zero-sized value buffer this is a pure size probe; otherwise the
/// value is copied straight into guest memory at `value_ptr`.
pub fn run_get(req: &mut Request<'_>) -> OpResult {
    let args = XAttrArgs::decode(&mut req.input_cursor()?)?;
    let name = bridge::read_cstring(&*req.mem, GuestAddr(args.name_ptr), args.name_size as usize)?;

    let mut value = vec![0u8; args.value_size as usize];
    let len = sys::lgetxattr(req.path, &name, &mut value)?;
    if len > 0 && !value.is_empty() {
        req.mem.copy_in(GuestAddr(args.value_ptr), &value[..len])?;
    }
    Ok(Reply::advertising(len as u64))
}

/// Same direct-copy contract as [`run_get`], for the NUL-separated name
/// list.
pub fn run_list(req: &mut Request<'_>) -> OpResult {
    let args = XAttrArgs::decode(&mut req.input_cursor()?)?;

    let mut list = vec![0u8; args.value_size as usize];
    let len = sys::llistxattr(req.path, &mut list)?;
    if len > 0 && !list.is_empty() {
        req.mem.copy_in(GuestAddr(args.value_ptr), &list[..len])?;
    }
    Ok(Reply::advertising(len as u64))
}

pub fn run_remove(req: &mut Request<'_>) -> OpResult {
    let args = XAttrArgs::decode(&mut req.input_cursor()?)?;
    let name = bridge::read_cstring(&*req.mem, GuestAddr(args.name_ptr), args.name_size as usize)?;
    sys::lremovexattr(req.path, &name)?;
    Ok(Reply::empty())
}
