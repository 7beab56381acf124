//! Wire-level types shared by the guest driver and the host executor.
//!
//! Everything in this module crosses the guest/host memory boundary as raw
//! bytes, so every record pins its field order and encodes through an
//! explicit codec with no implicit padding. Both ends run on the same
//! simulated machine, hence native byte order; the [`probe::TypeProbeArgs`]
//! exchange at mount time guards against the remaining layout drift.

pub mod ops;
pub mod probe;

use std::io::{self, Read, Write};

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

/// Result of wire decoding with error type [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while decoding wire records.
#[derive(Debug)]
pub enum Error {
    /// Short or failed read of the underlying bytes.
    IO(io::Error),
    /// Operation discriminant outside the closed enumeration.
    UnknownOperation(u32),
    /// Direction discriminant outside the closed enumeration.
    UnknownDirection(u32),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IO(err)
    }
}

/// Fixed width of one directory-entry name slot in a `ReadDir` reply.
///
/// Names longer than `NAME_SLOT_LEN - 1` bytes are truncated; the remainder
/// of the slot is NUL-padded.
pub const NAME_SLOT_LEN: usize = 256;

/// Identifies the file operation or protocol action carried by an envelope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum Operation {
    /// Failure response marker; `errnum` carries the host errno.
    Error = 0,
    /// Mount-time type-size sanity check.
    TypeProbe = 1,
    GetAttr = 2,
    ReadLink = 3,
    MakeDir = 4,
    Unlink = 5,
    RemoveDir = 6,
    MakeSymlink = 7,
    Rename = 8,
    ChangePermission = 9,
    ChangeOwner = 10,
    Truncate = 11,
    Open = 12,
    Read = 13,
    Write = 14,
    StatFs = 15,
    /// Reserved: completed by the guest driver without a hypercall.
    Flush = 16,
    Release = 17,
    Fsync = 18,
    SetXAttr = 19,
    GetXAttr = 20,
    ListXAttr = 21,
    RemoveXAttr = 22,
    /// Reserved: completed by the guest driver without a hypercall.
    OpenDir = 23,
    ReadDir = 24,
    /// Reserved: completed by the guest driver without a hypercall.
    ReleaseDir = 25,
    /// Reserved: completed by the guest driver without a hypercall.
    FsyncDir = 26,
    Access = 27,
    Create = 28,
    Ftruncate = 29,
    FGetAttr = 30,
    /// Second-stage transfer of a buffered reply payload.
    FetchPayload = 31,
    SetMountpoint = 32,
    GetMountpoint = 33,
}

/// Tells request and response envelopes apart; they share one layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum Direction {
    Unknown = 0,
    Request = 1,
    Response = 2,
}

/// The fixed-size request/response header copied across the boundary.
///
/// `path_ptr`/`path_len` locate a NUL-terminated path string in guest
/// memory (`path_len` excludes the NUL). On requests `payload_ptr` points at
/// the operation's auxiliary record in guest memory; on responses the
/// payload is not pointed to but fetched through `handle`. A zero `handle`
/// on a response means there is nothing to fetch. `errnum` is nonzero
/// exactly when `op` is [`Operation::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub op: Operation,
    pub direction: Direction,
    pub path_ptr: u64,
    pub path_len: u64,
    pub payload_ptr: u64,
    pub payload_size: u64,
    pub handle: u64,
    pub errnum: i32,
}

impl Envelope {
    /// Encoded size in bytes. Field widths are pinned by the codec below.
    pub const SIZE: usize = 52;

    /// Parses an envelope from its wire bytes.
    pub fn decode(src: &mut impl Read) -> Result<Self> {
        let op_raw = src.read_u32::<NativeEndian>()?;
        let op = Operation::from_u32(op_raw).ok_or(Error::UnknownOperation(op_raw))?;
        let dir_raw = src.read_u32::<NativeEndian>()?;
        let direction = Direction::from_u32(dir_raw).ok_or(Error::UnknownDirection(dir_raw))?;
        Ok(Envelope {
            op,
            direction,
            path_ptr: src.read_u64::<NativeEndian>()?,
            path_len: src.read_u64::<NativeEndian>()?,
            payload_ptr: src.read_u64::<NativeEndian>()?,
            payload_size: src.read_u64::<NativeEndian>()?,
            handle: src.read_u64::<NativeEndian>()?,
            errnum: src.read_i32::<NativeEndian>()?,
        })
    }

    /// Serializes the envelope into its wire bytes.
    pub fn encode(&self, dst: &mut impl Write) -> io::Result<()> {
        dst.write_u32::<NativeEndian>(self.op as u32)?;
        dst.write_u32::<NativeEndian>(self.direction as u32)?;
        dst.write_u64::<NativeEndian>(self.path_ptr)?;
        dst.write_u64::<NativeEndian>(self.path_len)?;
        dst.write_u64::<NativeEndian>(self.payload_ptr)?;
        dst.write_u64::<NativeEndian>(self.payload_size)?;
        dst.write_u64::<NativeEndian>(self.handle)?;
        dst.write_i32::<NativeEndian>(self.errnum)
    }

    /// Encodes into a fresh `SIZE`-byte buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        self.encode(&mut buf).expect("vec write cannot fail");
        buf
    }
}
