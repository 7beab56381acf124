//! Host-owned reply buffers and the handle table that tracks them between
//! the two transfer stages.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;

/// Owned payload of one buffered reply, one variant per kind of data an
/// operation can send back. Dropping a variant releases its storage.
#[derive(Debug)]
pub enum ReplyPayload {
    None,
    /// Raw bytes: file reads, readlink targets, the mount point.
    Bytes(Vec<u8>),
    /// Host file descriptor from `Open`/`Create`.
    Fd(i32),
    /// Byte count from `Write`.
    Written(i64),
    /// Raw `stat` record from `GetAttr`/`FGetAttr`.
    Stat(Box<libc::stat>),
    /// Raw `statvfs` record from `StatFs`.
    StatVfs(Box<libc::statvfs>),
    /// Concatenated fixed-width name slots from `ReadDir`.
    DirListing(Vec<u8>),
}

/// Views a flat libc record as its raw bytes for transfer into guest
/// memory. Sound for the POD records used here; the mount-time type probe
/// guarantees the guest expects exactly this many bytes.
fn record_bytes<T>(value: &T) -> &[u8] {
    unsafe { std::slice::from_raw_parts(value as *const T as *const u8, std::mem::size_of::<T>()) }
}

impl ReplyPayload {
    /// Exact byte count a fetch of this payload will deliver.
    pub fn len(&self) -> usize {
        match self {
            ReplyPayload::None => 0,
            ReplyPayload::Bytes(bytes) | ReplyPayload::DirListing(bytes) => bytes.len(),
            ReplyPayload::Fd(_) => std::mem::size_of::<i32>(),
            ReplyPayload::Written(_) => std::mem::size_of::<i64>(),
            ReplyPayload::Stat(_) => std::mem::size_of::<libc::stat>(),
            ReplyPayload::StatVfs(_) => std::mem::size_of::<libc::statvfs>(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The payload's wire bytes.
    pub fn bytes(&self) -> Cow<'_, [u8]> {
        match self {
            ReplyPayload::None => Cow::Borrowed(&[]),
            ReplyPayload::Bytes(bytes) | ReplyPayload::DirListing(bytes) => Cow::Borrowed(bytes),
            ReplyPayload::Fd(fd) => Cow::Owned(fd.to_ne_bytes().to_vec()),
            ReplyPayload::Written(count) => Cow::Owned(count.to_ne_bytes().to_vec()),
            ReplyPayload::Stat(st) => Cow::Borrowed(record_bytes(st.as_ref())),
            ReplyPayload::StatVfs(st) => Cow::Borrowed(record_bytes(st.as_ref())),
        }
    }
}

struct BufferedReply {
    payload: ReplyPayload,
    created: Instant,
    leak_logged: bool,
}

/// Table of buffered replies awaiting their fetch stage, keyed by the
/// opaque handle echoed through the guest. Handle 0 is reserved as the
/// "nothing to fetch" sentinel.
pub struct ReplyTable {
    entries: DashMap<u64, BufferedReply>,
    next_handle: AtomicU64,
}

impl ReplyTable {
    pub fn new() -> Self {
        ReplyTable { entries: DashMap::new(), next_handle: AtomicU64::new(1) }
    }

    /// Parks a payload and returns the handle the guest must echo back.
    pub fn insert(&self, payload: ReplyPayload) -> u64 {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.entries
            .insert(handle, BufferedReply { payload, created: Instant::now(), leak_logged: false });
        handle
    }

    /// Removes and returns the payload for `handle`; each handle can be
    /// consumed exactly once.
    pub fn take(&self, handle: u64) -> Option<ReplyPayload> {
        self.entries.remove(&handle).map(|(_, reply)| reply.payload)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logs (once per entry) replies whose fetch stage has not arrived
    /// within `threshold`. The entries stay parked: the protocol has no
    /// retry, and a paused simulator is indistinguishable from a guest that
    /// abandoned the fetch. Returns the number of newly reported leaks.
    pub fn log_stale(&self, threshold: Duration) -> usize {
        let mut reported = 0;
        for mut entry in self.entries.iter_mut() {
            let age = entry.created.elapsed();
            if age >= threshold && !entry.leak_logged {
                let handle = *entry.key();
                warn!(
                    handle,
                    age_secs = age.as_secs(),
                    size = entry.payload.len(),
                    "buffered reply was never fetched"
                );
                entry.leak_logged = true;
                reported += 1;
            }
        }
        reported
    }
}

impl Default for ReplyTable {
    fn default() -> Self {
        Self::new()
    }
}
