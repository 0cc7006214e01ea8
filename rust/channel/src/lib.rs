//! msgport - Channel Module
//!
//! The simple blocking backends: named pipe pair, POSIX message queue
//! pair, and TCP stream socket. Each is a direct pass-through to one OS
//! byte channel per direction, moving exactly one message worth of bytes
//! per call and relying on the OS's own queuing and blocking semantics.

pub mod error;
pub mod msg_queue;
pub mod pipe;
pub mod socket;

pub use error::*;
pub use msg_queue::MsgQueueTransport;
pub use pipe::FifoTransport;
pub use socket::TcpSocketTransport;
