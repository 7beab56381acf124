//! The host-side half of the bridge: receives a request through the
//! simulator's hypercall trap, executes the operation against the real host
//! filesystem, and delivers the reply through the two-stage protocol.

pub mod ops;
pub mod reply;

use std::sync::RwLock;

use tracing::{debug, trace, warn};

use crate::bridge::{self, GuestAddr, GuestMemory};
use crate::config::Config;
use crate::sys::UmaskGuard;
use crate::wire::{self, Direction, Envelope, Operation};

use ops::{Reply, Request};
use reply::ReplyTable;

/// Process-lifetime mount bookkeeping: set once by `SetMountpoint` at mount
/// time, read back by `GetMountpoint`. The executor never consults it when
/// resolving request paths.
#[derive(Debug, Default)]
pub struct MountState {
    /// Absolute path of the mount point inside the guest.
    pub guest_mountpoint: Vec<u8>,
    /// Host-side path recorded alongside it (`/` when the guest sends none).
    pub host_root: Vec<u8>,
}

/// Executes guest file operations against the host filesystem.
///
/// One instance serves a whole simulator run. Entry is re-entrant across
/// simulated threads; the host filesystem itself is the only serialization
/// the operations get.
pub struct HostExecutor {
    mount: RwLock<MountState>,
    replies: ReplyTable,
    config: Config,
}

impl HostExecutor {
    pub fn new(config: Config) -> Self {
        HostExecutor { mount: RwLock::new(MountState::default()), replies: ReplyTable::new(), config }
    }

    /// Number of buffered replies currently awaiting their fetch stage.
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }

    /// Hypercall entry point.
    ///
    /// `input` addresses the operation's auxiliary record, `request` the
    /// request envelope, `result` the slot for the reply envelope; all three
    /// are guest virtual addresses. The returned status word is reserved and
    /// currently always zero.
    pub fn process_request(
        &self,
        mem: &mut dyn GuestMemory,
        input: GuestAddr,
        request: GuestAddr,
        result: GuestAddr,
    ) -> u64 {
        self.replies.log_stale(self.config.leak_timeout());

        let mut header = [0u8; Envelope::SIZE];
        if let Err(fault) = mem.copy_out(request, &mut header) {
            warn!(addr = fault.addr.0, len = fault.len, "request envelope is unreadable");
            return 0;
        }
        let envelope = match Envelope::decode(&mut &header[..]) {
            Ok(envelope) => envelope,
            Err(err) => {
                let errnum = match err {
                    wire::Error::UnknownOperation(tag) => {
                        warn!(tag, "request carries an unknown operation");
                        libc::ENOSYS
                    }
                    _ => {
                        warn!(?err, "malformed request envelope");
                        libc::EINVAL
                    }
                };
                self.write_envelope(mem, result, &error_envelope(None, errnum));
                return 0;
            }
        };

        if envelope.op == Operation::FetchPayload {
            self.fetch(mem, &envelope, result);
            return 0;
        }

        let path = match bridge::read_path(&*mem, &envelope) {
            Ok(path) => path,
            Err(fault) => {
                warn!(addr = fault.addr.0, len = fault.len, "path string is unreadable");
                self.write_envelope(mem, result, &error_envelope(Some(&envelope), libc::EFAULT));
                return 0;
            }
        };

        debug!(
            op = ?envelope.op,
            path = %path.to_string_lossy(),
            input_size = envelope.payload_size,
            "dispatching request"
        );

        let outcome = {
            // Permission arguments must land exactly as given, and several
            // operations implicitly create inodes.
            let _umask = UmaskGuard::clear();
            ops::dispatch(&mut Request {
                mem: &mut *mem,
                envelope: &envelope,
                path: &path,
                input,
                mount: &self.mount,
            })
        };

        match outcome {
            Ok(reply) => self.write_success(mem, &envelope, result, reply),
            Err(err) => {
                debug!(op = ?envelope.op, errnum = err.errnum(), "operation failed");
                self.write_envelope(mem, result, &error_envelope(Some(&envelope), err.errnum()));
            }
        }
        0
    }

    /// Stage A delivery: park any payload, then write the reply envelope
    /// carrying the size hint and the fetch handle.
    fn write_success(
        &self,
        mem: &mut dyn GuestMemory,
        request: &Envelope,
        result: GuestAddr,
        reply: Reply,
    ) {
        let len = reply.payload.len() as u64;
        if len > self.config.max_payload_size {
            warn!(size = len, limit = self.config.max_payload_size, "reply payload over limit");
            self.write_envelope(mem, result, &error_envelope(Some(request), libc::EFBIG));
            return;
        }

        let (handle, payload_size) = if reply.payload.is_empty() {
            (0, reply.advertised.unwrap_or(0))
        } else {
            (self.replies.insert(reply.payload), len)
        };

        self.write_envelope(
            mem,
            result,
            &Envelope {
                op: request.op,
                direction: Direction::Response,
                path_ptr: request.path_ptr,
                path_len: request.path_len,
                payload_ptr: 0,
                payload_size,
                handle,
                errnum: 0,
            },
        );
    }

    /// Stage B: resolve the echoed handle, move the payload into the guest
    /// buffer, release the host copy, confirm through the reply envelope.
    fn fetch(&self, mem: &mut dyn GuestMemory, envelope: &Envelope, result: GuestAddr) {
        let Some(payload) = self.replies.take(envelope.handle) else {
            warn!(handle = envelope.handle, "fetch names an unknown or consumed handle");
            self.write_envelope(mem, result, &error_envelope(Some(envelope), libc::EINVAL));
            return;
        };

        let bytes = payload.bytes();
        if let Err(fault) = mem.copy_in(GuestAddr(envelope.payload_ptr), &bytes) {
            warn!(addr = fault.addr.0, len = fault.len, "payload transfer faulted");
            self.write_envelope(mem, result, &error_envelope(Some(envelope), libc::EFAULT));
            return;
        }
        trace!(handle = envelope.handle, size = bytes.len(), "payload delivered");

        self.write_envelope(
            mem,
            result,
            &Envelope {
                op: Operation::FetchPayload,
                direction: Direction::Response,
                path_ptr: envelope.path_ptr,
                path_len: envelope.path_len,
                payload_ptr: envelope.payload_ptr,
                payload_size: bytes.len() as u64,
                handle: 0,
                errnum: 0,
            },
        );
    }

    fn write_envelope(&self, mem: &mut dyn GuestMemory, result: GuestAddr, envelope: &Envelope) {
        if let Err(fault) = mem.copy_in(result, &envelope.to_bytes()) {
            warn!(addr = fault.addr.0, len = fault.len, "reply envelope is unwritable");
        }
    }
}

impl Default for HostExecutor {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Builds the failure reply for `request`, echoing its path fields when the
/// request itself was readable.
fn error_envelope(request: Option<&Envelope>, errnum: i32) -> Envelope {
    let (path_ptr, path_len) = match request {
        Some(request) => (request.path_ptr, request.path_len),
        None => (0, 0),
    };
    Envelope {
        op: Operation::Error,
        direction: Direction::Response,
        path_ptr,
        path_len,
        payload_ptr: 0,
        payload_size: 0,
        handle: 0,
        errnum,
    }
}
