//! Per-operation request handlers.
//!
//! One module per operation family, mirroring the dispatch table of the
//! executor. Each handler decodes its own input record from guest memory,
//! performs the host syscall, and describes the reply; envelope handling
//! and the two-stage delivery live in the executor.

mod access;
mod attr;
mod chmod;
mod chown;
mod fsync;
mod mk_dir;
mod mount_point;
mod open;
mod probe;
mod read;
mod read_dir;
mod read_link;
mod remove;
mod rename;
mod stat_fs;
mod symlink;
mod truncate;
mod write;
mod xattr;

use std::ffi::{CStr, CString};
use std::io::Cursor;
use std::sync::RwLock;

use tracing::warn;

use crate::bridge::{self, BridgeFault, GuestAddr, GuestMemory};
use crate::host::reply::ReplyPayload;
use crate::host::MountState;
use crate::sys::Errno;
use crate::wire::{self, Envelope, Operation};

/// One decoded request, as seen by a handler.
pub(crate) struct Request<'a> {
    pub mem: &'a mut dyn GuestMemory,
    pub envelope: &'a Envelope,
    pub path: &'a CStr,
    /// Guest address of the operation's input record.
    pub input: GuestAddr,
    pub mount: &'a RwLock<MountState>,
}

impl Request<'_> {
    /// The raw input record, `payload_size` bytes at `input`.
    fn input_bytes(&self) -> Result<Vec<u8>, OpError> {
        if self.envelope.payload_size == 0 {
            return Ok(Vec::new());
        }
        Ok(bridge::read_bytes(&*self.mem, self.input, self.envelope.payload_size as usize)?)
    }

    /// The input record as a decode cursor.
    fn input_cursor(&self) -> Result<Cursor<Vec<u8>>, OpError> {
        Ok(Cursor::new(self.input_bytes()?))
    }

    /// The input record as a string: `payload_size` bytes, NUL terminator
    /// included, cut at the first NUL.
    fn input_cstring(&self) -> Result<CString, OpError> {
        let raw = self.input_bytes()?;
        if raw.is_empty() {
            return Err(OpError::Malformed);
        }
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        CString::new(&raw[..end]).map_err(|_| OpError::Malformed)
    }
}

/// How a handler failed; the executor maps each case onto the reply errno.
#[derive(Debug)]
pub(crate) enum OpError {
    /// The host syscall failed.
    Sys(Errno),
    /// A guest address range did not translate.
    Fault(BridgeFault),
    /// The input record was absent or too short for its operation.
    Malformed,
}

impl OpError {
    pub fn errnum(&self) -> i32 {
        match self {
            OpError::Sys(errno) => errno.0,
            OpError::Fault(_) => libc::EFAULT,
            OpError::Malformed => libc::EINVAL,
        }
    }
}

impl From<Errno> for OpError {
    fn from(errno: Errno) -> Self {
        OpError::Sys(errno)
    }
}

impl From<BridgeFault> for OpError {
    fn from(fault: BridgeFault) -> Self {
        OpError::Fault(fault)
    }
}

impl From<wire::Error> for OpError {
    fn from(_: wire::Error) -> Self {
        OpError::Malformed
    }
}

/// A successful handler outcome.
pub(crate) struct Reply {
    /// Payload to park for the fetch stage; `None` means a bare
    /// acknowledgement.
    pub payload: ReplyPayload,
    /// `payload_size` to advertise when there is no payload to fetch; used
    /// by the operations that write into guest buffers directly.
    pub advertised: Option<u64>,
}

impl Reply {
    pub fn empty() -> Self {
        Reply { payload: ReplyPayload::None, advertised: None }
    }

    pub fn with(payload: ReplyPayload) -> Self {
        Reply { payload, advertised: None }
    }

    pub fn advertising(size: u64) -> Self {
        Reply { payload: ReplyPayload::None, advertised: Some(size) }
    }
}

pub(crate) type OpResult = Result<Reply, OpError>;

/// Routes a parsed request to its handler. `FetchPayload` never reaches
/// this table; the executor consumes it first.
pub(crate) fn dispatch(req: &mut Request<'_>) -> OpResult {
    match req.envelope.op {
        Operation::TypeProbe => probe::run(req),
        Operation::GetAttr => attr::run(req),
        Operation::FGetAttr => attr::run_fd(req),
        Operation::ReadLink => read_link::run(req),
        Operation::MakeDir => mk_dir::run(req),
        Operation::Unlink => remove::run_unlink(req),
        Operation::RemoveDir => remove::run_rmdir(req),
        Operation::MakeSymlink => symlink::run(req),
        Operation::Rename => rename::run(req),
        Operation::ChangePermission => chmod::run(req),
        Operation::ChangeOwner => chown::run(req),
        Operation::Truncate => truncate::run(req),
        Operation::Ftruncate => truncate::run_fd(req),
        Operation::Open => open::run(req),
        Operation::Create => open::run_create(req),
        Operation::Release => open::run_release(req),
        Operation::Read => read::run(req),
        Operation::Write => write::run(req),
        Operation::StatFs => stat_fs::run(req),
        Operation::Fsync => fsync::run(req),
        Operation::SetXAttr => xattr::run_set(req),
        Operation::GetXAttr => xattr::run_get(req),
        Operation::ListXAttr => xattr::run_list(req),
        Operation::RemoveXAttr => xattr::run_remove(req),
        Operation::ReadDir => read_dir::run(req),
        Operation::Access => access::run(req),
        Operation::SetMountpoint => mount_point::run_set(req),
        Operation::GetMountpoint => mount_point::run_get(req),
        op => {
            // Error, FetchPayload and the driver-local tags (Flush, OpenDir,
            // ReleaseDir, FsyncDir) have no host-side behavior.
            warn!(?op, "operation has no host handler");
            Err(OpError::Sys(Errno(libc::ENOSYS)))
        }
    }
}
