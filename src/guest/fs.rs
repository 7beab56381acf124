//! The POSIX-facing surface of the guest driver.
//!
//! One method per filesystem callback the guest kernel can deliver. Each is
//! a thin, mechanical translation onto [`call::submit`]: marshal the input
//! record, run the two-stage call, unmarshal the reply. Paths arrive
//! exactly as the kernel hands them to the driver and are forwarded
//! untouched.

use std::mem::size_of;

use crate::sys::Errno;
use crate::wire::ops::{ChownArgs, FtruncateArgs, ReadWriteArgs, SyncArgs, XAttrArgs};
use crate::wire::{Operation, NAME_SLOT_LEN};

use super::call::{self, CallReply};
use super::GuestPort;

/// Result type of every driver callback, with the host errno as the error.
pub type FsResult<T> = std::result::Result<T, Errno>;

/// The mounted passthrough filesystem, as seen from inside the guest.
pub struct PassthroughFs<P: GuestPort> {
    port: P,
    mountpoint: String,
}

impl<P: GuestPort> PassthroughFs<P> {
    /// Assembled by [`super::mount`] after the mount handshake succeeds.
    pub(super) fn new(port: P, mountpoint: String) -> Self {
        PassthroughFs { port, mountpoint }
    }

    /// The guest path this filesystem is mounted on.
    pub fn mountpoint(&self) -> &str {
        &self.mountpoint
    }

    /// The underlying driver environment.
    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    fn submit(&mut self, op: Operation, path: &str, input: &[u8]) -> call::CallResult {
        call::submit(&mut self.port, op, path, input)
    }

    fn submit_string(&mut self, op: Operation, path: &str, value: &str) -> FsResult<()> {
        let mut input = Vec::with_capacity(value.len() + 1);
        input.extend_from_slice(value.as_bytes());
        input.push(0);
        self.submit(op, path, &input)?;
        Ok(())
    }

    pub fn getattr(&mut self, path: &str) -> FsResult<libc::stat> {
        let reply = self.submit(Operation::GetAttr, path, &[])?;
        stat_from_bytes(&reply.payload)
    }

    pub fn fgetattr(&mut self, fd: i32) -> FsResult<libc::stat> {
        let reply = self.submit(Operation::FGetAttr, "", &fd.to_ne_bytes())?;
        stat_from_bytes(&reply.payload)
    }

    /// Resolves a symlink. Absolute targets are re-rooted under the mount
    /// point so they resolve inside the guest's view of the tree.
    pub fn readlink(&mut self, path: &str, buf_size: usize) -> FsResult<String> {
        let reply =
            self.submit(Operation::ReadLink, path, &(buf_size as u64).to_ne_bytes())?;
        let end = reply.payload.iter().position(|&b| b == 0).unwrap_or(reply.payload.len());
        let target = String::from_utf8_lossy(&reply.payload[..end]).into_owned();
        if target.starts_with('/') {
            return Ok(format!("{}{}", self.mountpoint, target));
        }
        Ok(target)
    }

    pub fn mkdir(&mut self, path: &str, mode: u32) -> FsResult<()> {
        self.submit(Operation::MakeDir, path, &mode.to_ne_bytes())?;
        Ok(())
    }

    pub fn unlink(&mut self, path: &str) -> FsResult<()> {
        self.submit(Operation::Unlink, path, &[])?;
        Ok(())
    }

    pub fn rmdir(&mut self, path: &str) -> FsResult<()> {
        self.submit(Operation::RemoveDir, path, &[])?;
        Ok(())
    }

    /// `target` is what the new link will point at; `link` is the path of
    /// the link itself.
    pub fn symlink(&mut self, target: &str, link: &str) -> FsResult<()> {
        self.submit_string(Operation::MakeSymlink, target, link)
    }

    pub fn rename(&mut self, from: &str, to: &str) -> FsResult<()> {
        self.submit_string(Operation::Rename, from, to)
    }

    pub fn chmod(&mut self, path: &str, mode: u32) -> FsResult<()> {
        self.submit(Operation::ChangePermission, path, &mode.to_ne_bytes())?;
        Ok(())
    }

    pub fn chown(&mut self, path: &str, uid: u32, gid: u32) -> FsResult<()> {
        let mut input = Vec::with_capacity(ChownArgs::SIZE);
        ChownArgs { uid, gid }.encode(&mut input).map_err(|_| Errno(libc::EIO))?;
        self.submit(Operation::ChangeOwner, path, &input)?;
        Ok(())
    }

    pub fn truncate(&mut self, path: &str, length: i64) -> FsResult<()> {
        self.submit(Operation::Truncate, path, &length.to_ne_bytes())?;
        Ok(())
    }

    pub fn ftruncate(&mut self, fd: i32, length: i64) -> FsResult<()> {
        let mut input = Vec::with_capacity(FtruncateArgs::SIZE);
        FtruncateArgs { length, fd }.encode(&mut input).map_err(|_| Errno(libc::EIO))?;
        self.submit(Operation::Ftruncate, "", &input)?;
        Ok(())
    }

    /// Opens the host file and returns the host descriptor the guest must
    /// carry in its file handle.
    pub fn open(&mut self, path: &str, flags: i32) -> FsResult<i32> {
        let reply = self.submit(Operation::Open, path, &flags.to_ne_bytes())?;
        fd_from_bytes(&reply.payload)
    }

    pub fn create(&mut self, path: &str, mode: u32) -> FsResult<i32> {
        let reply = self.submit(Operation::Create, path, &mode.to_ne_bytes())?;
        fd_from_bytes(&reply.payload)
    }

    pub fn release(&mut self, fd: i32) -> FsResult<()> {
        self.submit(Operation::Release, "", &fd.to_ne_bytes())?;
        Ok(())
    }

    /// Reads up to `size` bytes at `offset`; short reads mean end-of-file.
    pub fn read(&mut self, path: &str, fd: i32, size: usize, offset: i64) -> FsResult<Vec<u8>> {
        let args = ReadWriteArgs { fd, size: size as u64, offset, data_ptr: 0 };
        let mut input = Vec::with_capacity(ReadWriteArgs::SIZE);
        args.encode(&mut input).map_err(|_| Errno(libc::EIO))?;
        let reply = self.submit(Operation::Read, path, &input)?;
        Ok(reply.payload)
    }

    /// Writes `data` at `offset` and returns the count the host reported.
    pub fn write(&mut self, path: &str, fd: i32, data: &[u8], offset: i64) -> FsResult<i64> {
        // The data crosses in place: the host copies it straight out of
        // this allocation during stage A.
        let data_ptr = self.port.alloc(data.len()).ok_or(Errno(libc::ENOMEM))?;
        self.port.write(data_ptr, data);

        let args = ReadWriteArgs { fd, size: data.len() as u64, offset, data_ptr: data_ptr.0 };
        let mut input = Vec::with_capacity(ReadWriteArgs::SIZE);
        args.encode(&mut input).map_err(|_| Errno(libc::EIO))?;
        let outcome = self.submit(Operation::Write, path, &input);
        self.port.free(data_ptr, data.len());

        let reply = outcome?;
        if reply.payload.len() != size_of::<i64>() {
            return Err(Errno(libc::EIO));
        }
        let mut count = [0u8; size_of::<i64>()];
        count.copy_from_slice(&reply.payload);
        Ok(i64::from_ne_bytes(count))
    }

    pub fn statfs(&mut self, path: &str) -> FsResult<libc::statvfs> {
        let reply = self.submit(Operation::StatFs, path, &[])?;
        statvfs_from_bytes(&reply.payload)
    }

    /// Nothing is cached, so there is nothing to flush.
    pub fn flush(&mut self, _fd: i32) -> FsResult<()> {
        Ok(())
    }

    pub fn fsync(&mut self, fd: i32, datasync: bool) -> FsResult<()> {
        let args = SyncArgs { datasync: datasync as u8, fd };
        let mut input = Vec::with_capacity(SyncArgs::SIZE);
        args.encode(&mut input).map_err(|_| Errno(libc::EIO))?;
        self.submit(Operation::Fsync, "", &input)?;
        Ok(())
    }

    pub fn setxattr(&mut self, path: &str, name: &str, value: &[u8], flags: i32) -> FsResult<()> {
        let name_ptr = self.alloc_string(name)?;
        let value_ptr = self.port.alloc(value.len()).ok_or(Errno(libc::ENOMEM))?;
        self.port.write(value_ptr, value);

        let args = XAttrArgs {
            name_ptr: name_ptr.0,
            value_ptr: value_ptr.0,
            name_size: name.len() as u64,
            value_size: value.len() as u64,
            flags,
        };
        let outcome = self.submit_xattr(Operation::SetXAttr, path, &args);
        self.port.free(name_ptr, name.len() + 1);
        self.port.free(value_ptr, value.len());
        outcome.map(drop)
    }

    /// Probes an attribute value's length without transferring it.
    pub fn getxattr_len(&mut self, path: &str, name: &str) -> FsResult<usize> {
        let name_ptr = self.alloc_string(name)?;
        let args = XAttrArgs {
            name_ptr: name_ptr.0,
            value_ptr: 0,
            name_size: name.len() as u64,
            value_size: 0,
            flags: 0,
        };
        let outcome = self.submit_xattr(Operation::GetXAttr, path, &args);
        self.port.free(name_ptr, name.len() + 1);
        Ok(outcome?.envelope.payload_size as usize)
    }

    /// Fetches an attribute value into a guest buffer of `size` bytes; the
    /// host writes the value there directly, outside the two-stage path.
    pub fn getxattr(&mut self, path: &str, name: &str, size: usize) -> FsResult<Vec<u8>> {
        let name_ptr = self.alloc_string(name)?;
        let value_ptr = self.port.alloc(size).ok_or(Errno(libc::ENOMEM))?;
        self.port.write(value_ptr, &vec![0u8; size]);

        let args = XAttrArgs {
            name_ptr: name_ptr.0,
            value_ptr: value_ptr.0,
            name_size: name.len() as u64,
            value_size: size as u64,
            flags: 0,
        };
        let outcome = self.submit_xattr(Operation::GetXAttr, path, &args);
        self.port.free(name_ptr, name.len() + 1);

        let result = match outcome {
            Ok(reply) => {
                let len = (reply.envelope.payload_size as usize).min(size);
                Ok(self.port.read(value_ptr, len))
            }
            Err(err) => Err(err),
        };
        self.port.free(value_ptr, size);
        result
    }

    /// Probes the attribute-name list's length without transferring it.
    pub fn listxattr_len(&mut self, path: &str) -> FsResult<usize> {
        let args =
            XAttrArgs { name_ptr: 0, value_ptr: 0, name_size: 0, value_size: 0, flags: 0 };
        Ok(self.submit_xattr(Operation::ListXAttr, path, &args)?.envelope.payload_size as usize)
    }

    /// Fetches the NUL-separated attribute-name list into a guest buffer of
    /// `size` bytes; same direct-copy contract as [`Self::getxattr`].
    pub fn listxattr(&mut self, path: &str, size: usize) -> FsResult<Vec<u8>> {
        let value_ptr = self.port.alloc(size).ok_or(Errno(libc::ENOMEM))?;
        self.port.write(value_ptr, &vec![0u8; size]);

        let args = XAttrArgs {
            name_ptr: 0,
            value_ptr: value_ptr.0,
            name_size: 0,
            value_size: size as u64,
            flags: 0,
        };
        let outcome = self.submit_xattr(Operation::ListXAttr, path, &args);

        let result = match outcome {
            Ok(reply) => {
                let len = (reply.envelope.payload_size as usize).min(size);
                Ok(self.port.read(value_ptr, len))
            }
            Err(err) => Err(err),
        };
        self.port.free(value_ptr, size);
        result
    }

    pub fn removexattr(&mut self, path: &str, name: &str) -> FsResult<()> {
        let name_ptr = self.alloc_string(name)?;
        let args = XAttrArgs {
            name_ptr: name_ptr.0,
            value_ptr: 0,
            name_size: name.len() as u64,
            value_size: 0,
            flags: 0,
        };
        let outcome = self.submit_xattr(Operation::RemoveXAttr, path, &args);
        self.port.free(name_ptr, name.len() + 1);
        outcome.map(drop)
    }

    /// Directories are opened and closed by the host within `readdir`.
    pub fn opendir(&mut self, _path: &str) -> FsResult<()> {
        Ok(())
    }

    /// Lists a directory. The host replies with fixed-width name slots;
    /// entries come back in the host's enumeration order, `.` and `..`
    /// included.
    pub fn readdir(&mut self, path: &str) -> FsResult<Vec<String>> {
        let reply = self.submit(Operation::ReadDir, path, &[])?;
        if reply.payload.len() % NAME_SLOT_LEN != 0 {
            return Err(Errno(libc::EIO));
        }
        let names = reply
            .payload
            .chunks_exact(NAME_SLOT_LEN)
            .map(|slot| {
                let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
                String::from_utf8_lossy(&slot[..end]).into_owned()
            })
            .collect();
        Ok(names)
    }

    pub fn releasedir(&mut self, _path: &str) -> FsResult<()> {
        Ok(())
    }

    pub fn fsyncdir(&mut self, _path: &str, _datasync: bool) -> FsResult<()> {
        Ok(())
    }

    pub fn access(&mut self, path: &str, mask: i32) -> FsResult<()> {
        self.submit(Operation::Access, path, &mask.to_ne_bytes())?;
        Ok(())
    }

    /// Reads back the mount point recorded by the mount handshake; mostly a
    /// protocol self-check.
    pub fn remote_mountpoint(&mut self) -> FsResult<String> {
        let reply = self.submit(Operation::GetMountpoint, "", &[])?;
        Ok(String::from_utf8_lossy(&reply.payload).into_owned())
    }

    fn alloc_string(&mut self, value: &str) -> FsResult<crate::bridge::GuestAddr> {
        let addr = self.port.alloc(value.len() + 1).ok_or(Errno(libc::ENOMEM))?;
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        self.port.write(addr, &bytes);
        Ok(addr)
    }

    fn submit_xattr(
        &mut self,
        op: Operation,
        path: &str,
        args: &XAttrArgs,
    ) -> std::result::Result<CallReply, Errno> {
        let mut input = Vec::with_capacity(XAttrArgs::SIZE);
        args.encode(&mut input).map_err(|_| Errno(libc::EIO))?;
        self.submit(op, path, &input)
    }
}

fn fd_from_bytes(bytes: &[u8]) -> FsResult<i32> {
    if bytes.len() != size_of::<i32>() {
        return Err(Errno(libc::EIO));
    }
    let mut fd = [0u8; size_of::<i32>()];
    fd.copy_from_slice(bytes);
    Ok(i32::from_ne_bytes(fd))
}

fn stat_from_bytes(bytes: &[u8]) -> FsResult<libc::stat> {
    if bytes.len() != size_of::<libc::stat>() {
        return Err(Errno(libc::EIO));
    }
    // The probe pinned the size at mount time; alignment is not guaranteed,
    // hence the unaligned read.
    Ok(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const libc::stat) })
}

fn statvfs_from_bytes(bytes: &[u8]) -> FsResult<libc::statvfs> {
    if bytes.len() != size_of::<libc::statvfs>() {
        return Err(Errno(libc::EIO));
    }
    Ok(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const libc::statvfs) })
}
