//! msgport
//!
//! Small fixed-format messages exchanged between two cooperating
//! processes through one of several interchangeable transport mechanisms,
//! selected at configuration time without changing any call site. Every
//! backend honors the same four-operation contract: initialize, send,
//! receive, cleanup.

pub use msgport_core::{
    Message, Result, Transport, TransportError, TransportKind, PAYLOAD_SIZE,
};

pub use msgport_channel::{FifoTransport, MsgQueueTransport, TcpSocketTransport};
pub use msgport_mailbox::{MailboxSlot, SharedMemoryTransport, SharedRegion, SignalTransport};

/// Construct a fresh, uninitialized backend for the requested mechanism
///
/// Pure dispatch with no shared state. Unrecognized mechanism names are
/// handled at the string boundary by [`TransportKind::from_name`], which
/// returns `None` for them.
pub fn create_transport(kind: TransportKind) -> Box<dyn Transport> {
    match kind {
        TransportKind::Pipe => Box::new(FifoTransport::new()),
        TransportKind::SharedMemory => Box::new(SharedMemoryTransport::new()),
        TransportKind::Signal => Box::new(SignalTransport::new()),
        TransportKind::MessageQueue => Box::new(MsgQueueTransport::new()),
        TransportKind::Socket => Box::new(TcpSocketTransport::new()),
    }
}
