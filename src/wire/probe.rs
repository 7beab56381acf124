//! The mount-time type-size probe.
//!
//! Compatibility of the whole protocol rests on the guest compiler and the
//! simulator host compiler agreeing on the width of every scalar and record
//! that crosses the boundary. The guest reports its local `sizeof` for each
//! of them in a [`TypeProbeArgs`] request; the host compares against its own
//! and rejects the mount on any difference.

use std::io::{self, Read, Write};
use std::mem::size_of;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use super::ops::{ChownArgs, FtruncateArgs, ReadWriteArgs, SyncArgs, XAttrArgs};
use super::{Envelope, Result};

/// Reported size of every scalar and record the protocol uses, its own size
/// included. All fields are byte counts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TypeProbeArgs {
    pub char_size: u64,
    pub int_size: u64,
    pub usize_size: u64,
    pub mode_t_size: u64,
    pub uid_t_size: u64,
    pub gid_t_size: u64,
    pub off_t_size: u64,
    pub stat_size: u64,
    pub statvfs_size: u64,
    pub envelope_size: u64,
    pub read_write_args_size: u64,
    pub chown_args_size: u64,
    pub sync_args_size: u64,
    pub xattr_args_size: u64,
    pub ftruncate_args_size: u64,
    pub probe_args_size: u64,
}

/// Field count; the encoded record is `FIELDS * 8` bytes.
const FIELDS: usize = 16;

impl TypeProbeArgs {
    pub const SIZE: usize = FIELDS * 8;

    /// Builds the probe from this side's local sizes.
    pub fn local() -> Self {
        TypeProbeArgs {
            char_size: size_of::<libc::c_char>() as u64,
            int_size: size_of::<libc::c_int>() as u64,
            usize_size: size_of::<usize>() as u64,
            mode_t_size: size_of::<libc::mode_t>() as u64,
            uid_t_size: size_of::<libc::uid_t>() as u64,
            gid_t_size: size_of::<libc::gid_t>() as u64,
            off_t_size: size_of::<libc::off_t>() as u64,
            stat_size: size_of::<libc::stat>() as u64,
            statvfs_size: size_of::<libc::statvfs>() as u64,
            envelope_size: Envelope::SIZE as u64,
            read_write_args_size: ReadWriteArgs::SIZE as u64,
            chown_args_size: ChownArgs::SIZE as u64,
            sync_args_size: SyncArgs::SIZE as u64,
            xattr_args_size: XAttrArgs::SIZE as u64,
            ftruncate_args_size: FtruncateArgs::SIZE as u64,
            probe_args_size: Self::SIZE as u64,
        }
    }

    /// Names of the fields whose reported size differs from this side's
    /// local size. Empty means the two sides agree on every width.
    pub fn mismatches(&self) -> Vec<&'static str> {
        let local = Self::local();
        self.fields()
            .into_iter()
            .zip(local.fields())
            .filter(|(reported, expected)| reported.1 != expected.1)
            .map(|(reported, _)| reported.0)
            .collect()
    }

    fn fields(&self) -> [(&'static str, u64); FIELDS] {
        [
            ("char", self.char_size),
            ("int", self.int_size),
            ("usize", self.usize_size),
            ("mode_t", self.mode_t_size),
            ("uid_t", self.uid_t_size),
            ("gid_t", self.gid_t_size),
            ("off_t", self.off_t_size),
            ("stat", self.stat_size),
            ("statvfs", self.statvfs_size),
            ("envelope", self.envelope_size),
            ("read_write_args", self.read_write_args_size),
            ("chown_args", self.chown_args_size),
            ("sync_args", self.sync_args_size),
            ("xattr_args", self.xattr_args_size),
            ("ftruncate_args", self.ftruncate_args_size),
            ("probe_args", self.probe_args_size),
        ]
    }

    pub fn decode(src: &mut impl Read) -> Result<Self> {
        let mut sizes = [0u64; FIELDS];
        for size in sizes.iter_mut() {
            *size = src.read_u64::<NativeEndian>()?;
        }
        Ok(TypeProbeArgs {
            char_size: sizes[0],
            int_size: sizes[1],
            usize_size: sizes[2],
            mode_t_size: sizes[3],
            uid_t_size: sizes[4],
            gid_t_size: sizes[5],
            off_t_size: sizes[6],
            stat_size: sizes[7],
            statvfs_size: sizes[8],
            envelope_size: sizes[9],
            read_write_args_size: sizes[10],
            chown_args_size: sizes[11],
            sync_args_size: sizes[12],
            xattr_args_size: sizes[13],
            ftruncate_args_size: sizes[14],
            probe_args_size: sizes[15],
        })
    }

    pub fn encode(&self, dst: &mut impl Write) -> io::Result<()> {
        for (_, size) in self.fields() {
            dst.write_u64::<NativeEndian>(size)?;
        }
        Ok(())
    }
}
