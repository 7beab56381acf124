//! Per-operation payload records.
//!
//! Each record is flat, field-order pinned, and carried verbatim in guest
//! memory at the envelope's `payload_ptr`. Guest-address fields are plain
//! `u64` here; the host never dereferences them without going through the
//! memory bridge.

use std::io::{self, Read, Write};

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use super::Result;

/// Arguments shared by `Read` and `Write`.
///
/// For writes, `data_ptr` is the guest address of the `size` bytes to be
/// written; for reads it is ignored (the data travels back as a fetched
/// payload instead).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReadWriteArgs {
    pub fd: i32,
    pub size: u64,
    pub offset: i64,
    pub data_ptr: u64,
}

impl ReadWriteArgs {
    pub const SIZE: usize = 28;

    pub fn decode(src: &mut impl Read) -> Result<Self> {
        Ok(ReadWriteArgs {
            fd: src.read_i32::<NativeEndian>()?,
            size: src.read_u64::<NativeEndian>()?,
            offset: src.read_i64::<NativeEndian>()?,
            data_ptr: src.read_u64::<NativeEndian>()?,
        })
    }

    pub fn encode(&self, dst: &mut impl Write) -> io::Result<()> {
        dst.write_i32::<NativeEndian>(self.fd)?;
        dst.write_u64::<NativeEndian>(self.size)?;
        dst.write_i64::<NativeEndian>(self.offset)?;
        dst.write_u64::<NativeEndian>(self.data_ptr)
    }
}

/// Arguments for `ChangeOwner`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChownArgs {
    pub uid: u32,
    pub gid: u32,
}

impl ChownArgs {
    pub const SIZE: usize = 8;

    pub fn decode(src: &mut impl Read) -> Result<Self> {
        Ok(ChownArgs {
            uid: src.read_u32::<NativeEndian>()?,
            gid: src.read_u32::<NativeEndian>()?,
        })
    }

    pub fn encode(&self, dst: &mut impl Write) -> io::Result<()> {
        dst.write_u32::<NativeEndian>(self.uid)?;
        dst.write_u32::<NativeEndian>(self.gid)
    }
}

/// Arguments for `Fsync`. A nonzero `datasync` requests `fdatasync`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SyncArgs {
    pub datasync: u8,
    pub fd: i32,
}

impl SyncArgs {
    pub const SIZE: usize = 5;

    pub fn decode(src: &mut impl Read) -> Result<Self> {
        Ok(SyncArgs { datasync: src.read_u8()?, fd: src.read_i32::<NativeEndian>()? })
    }

    pub fn encode(&self, dst: &mut impl Write) -> io::Result<()> {
        dst.write_u8(self.datasync)?;
        dst.write_i32::<NativeEndian>(self.fd)
    }
}

/// Arguments shared by the four extended-attribute operations.
///
/// `name_ptr` addresses a NUL-terminated attribute name of `name_size`
/// bytes (NUL excluded). `value_ptr`/`value_size` describe the value buffer:
/// guest-owned input for `SetXAttr`, a guest destination written directly by
/// the host for `GetXAttr`/`ListXAttr`. A zero `value_size` turns the get
/// and list variants into pure size probes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct XAttrArgs {
    pub name_ptr: u64,
    pub value_ptr: u64,
    pub name_size: u64,
    pub value_size: u64,
    pub flags: i32,
}

impl XAttrArgs {
    pub const SIZE: usize = 36;

    pub fn decode(src: &mut impl Read) -> Result<Self> {
        Ok(XAttrArgs {
            name_ptr: src.read_u64::<NativeEndian>()?,
            value_ptr: src.read_u64::<NativeEndian>()?,
            name_size: src.read_u64::<NativeEndian>()?,
            value_size: src.read_u64::<NativeEndian>()?,
            flags: src.read_i32::<NativeEndian>()?,
        })
    }

    pub fn encode(&self, dst: &mut impl Write) -> io::Result<()> {
        dst.write_u64::<NativeEndian>(self.name_ptr)?;
        dst.write_u64::<NativeEndian>(self.value_ptr)?;
        dst.write_u64::<NativeEndian>(self.name_size)?;
        dst.write_u64::<NativeEndian>(self.value_size)?;
        dst.write_i32::<NativeEndian>(self.flags)
    }
}

/// Arguments for `Ftruncate`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FtruncateArgs {
    pub length: i64,
    pub fd: i32,
}

impl FtruncateArgs {
    pub const SIZE: usize = 12;

    pub fn decode(src: &mut impl Read) -> Result<Self> {
        Ok(FtruncateArgs {
            length: src.read_i64::<NativeEndian>()?,
            fd: src.read_i32::<NativeEndian>()?,
        })
    }

    pub fn encode(&self, dst: &mut impl Write) -> io::Result<()> {
        dst.write_i64::<NativeEndian>(self.length)?;
        dst.write_i32::<NativeEndian>(self.fd)
    }
}

/// Parses the single `mode_t` carried by `MakeDir`, `ChangePermission` and
/// `Create`.
pub fn decode_mode(src: &mut impl Read) -> Result<u32> {
    Ok(src.read_u32::<NativeEndian>()?)
}

/// Parses the single `off_t` carried by `Truncate`.
pub fn decode_offset(src: &mut impl Read) -> Result<i64> {
    Ok(src.read_i64::<NativeEndian>()?)
}

/// Parses the single `int` carried by `Open` (flags), `Access` (mask),
/// `Release` and `FGetAttr` (file descriptors).
pub fn decode_int(src: &mut impl Read) -> Result<i32> {
    Ok(src.read_i32::<NativeEndian>()?)
}

/// Parses the guest buffer size carried by `ReadLink`.
pub fn decode_size(src: &mut impl Read) -> Result<u64> {
    Ok(src.read_u64::<NativeEndian>()?)
}
