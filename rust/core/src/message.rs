//! Fixed-layout message exchanged between two peer processes
//!
//! The message is copied verbatim across every transport: no header, no
//! length prefix, no byte-order normalization. Both peers are assumed to
//! share the same in-memory layout and endianness.

use crate::{Result, TransportError};

/// Fixed payload capacity in bytes
pub const PAYLOAD_SIZE: usize = 256;

/// Message exchanged end to end over any transport
///
/// `ready` is the single-slot flow-control flag used by the mailbox
/// backends; the byte-channel backends carry it verbatim but ignore it.
/// `finished` marks the final message of an exchange.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Message {
    /// Sequence counter, also carries the process id during the signal
    /// backend's identity handshake
    pub counter: u32,
    /// Slot occupancy flag for the single-slot mailbox backends
    pub ready: bool,
    /// End-of-exchange marker
    pub finished: bool,
    /// Explicit padding so the struct has no compiler-inserted padding and
    /// can be copied as raw bytes
    reserved: [u8; 2],
    /// Message content, zero-filled past the caller's data
    pub payload: [u8; PAYLOAD_SIZE],
}

impl Message {
    /// Exact size of a message on every transport
    pub const WIRE_SIZE: usize = std::mem::size_of::<Message>();

    /// Create a zeroed message
    pub fn new() -> Self {
        Self {
            counter: 0,
            ready: false,
            finished: false,
            reserved: [0; 2],
            payload: [0; PAYLOAD_SIZE],
        }
    }

    /// Create a zeroed message with the given counter
    pub fn with_counter(counter: u32) -> Self {
        let mut msg = Self::new();
        msg.counter = counter;
        msg
    }

    /// Replace the payload, zero-filling the remainder
    ///
    /// Fails if `data` exceeds the fixed capacity.
    pub fn set_payload(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > PAYLOAD_SIZE {
            return Err(TransportError::InvalidData(format!(
                "payload of {} bytes exceeds capacity of {}",
                data.len(),
                PAYLOAD_SIZE
            )));
        }
        self.payload = [0; PAYLOAD_SIZE];
        self.payload[..data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Payload interpreted as text, up to the first NUL byte
    pub fn payload_text(&self) -> String {
        let end = self
            .payload
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(PAYLOAD_SIZE);
        String::from_utf8_lossy(&self.payload[..end]).into_owned()
    }

    /// View the message as its exact wire bytes
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        unsafe { std::mem::transmute(*self) }
    }

    /// Reconstruct a message from its exact wire bytes
    ///
    /// The two flag bytes are reduced to 0 or 1 first: a foreign writer
    /// may put any value there, and only 0 and 1 are valid `bool` bit
    /// patterns.
    pub fn from_bytes(bytes: &[u8; Self::WIRE_SIZE]) -> Self {
        let mut raw = *bytes;
        for offset in [
            std::mem::offset_of!(Message, ready),
            std::mem::offset_of!(Message, finished),
        ] {
            raw[offset] = (raw[offset] != 0) as u8;
        }
        unsafe { std::mem::transmute(raw) }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("counter", &self.counter)
            .field("ready", &self.ready)
            .field("finished", &self.finished)
            .field("payload", &self.payload_text())
            .finish()
    }
}
