//! The two-stage call sequence, as performed by the guest.

use tracing::trace;

use crate::bridge::GuestAddr;
use crate::sys::Errno;
use crate::wire::{Direction, Envelope, Operation};

use super::GuestPort;

/// Outcome of one completed operation.
#[derive(Debug)]
pub struct CallReply {
    /// The stage-A response envelope.
    pub envelope: Envelope,
    /// The fetched payload; empty when the operation carried none.
    pub payload: Vec<u8>,
}

/// Result of a call with the host's errno as the error type.
pub type CallResult = std::result::Result<CallReply, Errno>;

/// Scratch buffers a call places in guest memory, freed on every exit path.
struct CallFrame<'a> {
    port: &'a mut dyn GuestPort,
    blocks: Vec<(GuestAddr, usize)>,
}

impl<'a> CallFrame<'a> {
    fn new(port: &'a mut dyn GuestPort) -> Self {
        CallFrame { port, blocks: Vec::new() }
    }

    fn alloc(&mut self, bytes: &[u8]) -> Result<GuestAddr, Errno> {
        let addr = self.port.alloc(bytes.len()).ok_or(Errno(libc::ENOMEM))?;
        self.blocks.push((addr, bytes.len()));
        self.port.write(addr, bytes);
        Ok(addr)
    }
}

impl Drop for CallFrame<'_> {
    fn drop(&mut self) {
        for (addr, len) in self.blocks.drain(..) {
            self.port.free(addr, len);
        }
    }
}

/// Runs one operation against the host.
///
/// Builds the request envelope in guest memory, issues the hypercall, and —
/// when the response carries a fetch handle — allocates a buffer of the
/// advertised size, zeroes it so every page is populated, and issues the
/// `FetchPayload` hypercall that moves the payload in. String inputs must
/// include their NUL terminator in `input`.
pub fn submit(port: &mut dyn GuestPort, op: Operation, path: &str, input: &[u8]) -> CallResult {
    let mut frame = CallFrame::new(port);

    let path_bytes = path.as_bytes();
    let path_ptr = if path_bytes.is_empty() {
        GuestAddr::NULL
    } else {
        let mut with_nul = Vec::with_capacity(path_bytes.len() + 1);
        with_nul.extend_from_slice(path_bytes);
        with_nul.push(0);
        frame.alloc(&with_nul)?
    };
    let input_ptr =
        if input.is_empty() { GuestAddr::NULL } else { frame.alloc(input)? };

    let request = Envelope {
        op,
        direction: Direction::Request,
        path_ptr: path_ptr.0,
        path_len: path_bytes.len() as u64,
        payload_ptr: input_ptr.0,
        payload_size: input.len() as u64,
        handle: 0,
        errnum: 0,
    };
    let request_ptr = frame.alloc(&request.to_bytes())?;
    let result_ptr = frame.alloc(&[0u8; Envelope::SIZE])?;

    frame.port.hypercall(input_ptr, request_ptr, result_ptr);
    let response = read_envelope(&*frame.port, result_ptr)?;
    trace!(op = ?op, reply = ?response.op, size = response.payload_size, "stage A complete");

    if response.op == Operation::Error {
        return Err(Errno(response.errnum));
    }
    if response.handle == 0 {
        return Ok(CallReply { envelope: response, payload: Vec::new() });
    }

    // Stage B: a zeroed buffer of exactly the advertised size. On
    // allocation failure the host-side reply is abandoned; the executor's
    // leak detection will eventually report it.
    let size = response.payload_size as usize;
    let buffer = frame.alloc(&vec![0u8; size])?;

    let fetch = Envelope {
        op: Operation::FetchPayload,
        direction: Direction::Request,
        path_ptr: path_ptr.0,
        path_len: path_bytes.len() as u64,
        payload_ptr: buffer.0,
        payload_size: size as u64,
        handle: response.handle,
        errnum: 0,
    };
    frame.port.write(request_ptr, &fetch.to_bytes());
    frame.port.hypercall(GuestAddr::NULL, request_ptr, result_ptr);

    let confirmation = read_envelope(&*frame.port, result_ptr)?;
    if confirmation.op == Operation::Error {
        return Err(Errno(confirmation.errnum));
    }
    trace!(op = ?op, size, "stage B complete");

    let payload = frame.port.read(buffer, size);
    Ok(CallReply { envelope: response, payload })
}

fn read_envelope(port: &dyn GuestPort, addr: GuestAddr) -> Result<Envelope, Errno> {
    let bytes = port.read(addr, Envelope::SIZE);
    Envelope::decode(&mut bytes.as_slice()).map_err(|_| Errno(libc::EIO))
}
