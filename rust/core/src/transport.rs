//! Core transport abstractions

use crate::{Message, Result};
use serde::{Deserialize, Serialize};

/// Contract every transport backend implements
///
/// A caller obtains a backend, calls [`initialize`](Transport::initialize)
/// exactly once (one side with `create = true`, the other with
/// `create = false`), then alternates [`send_message`](Transport::send_message)
/// and [`receive_message`](Transport::receive_message). Both calls block
/// indefinitely until their completion condition holds; there is no timeout
/// or cancellation primitive. Callers needing bounded waits must wrap the
/// transport themselves.
pub trait Transport: Send {
    /// Establish or attach to the named resource
    ///
    /// `create = true` makes this instance the owner: it allocates the
    /// resource and is later responsible for removing it from the system
    /// namespace. `create = false` attaches to a resource the peer already
    /// created. Call exactly once per instance; failures (naming collision,
    /// permission denial, peer not yet listening) are fatal to the attempt
    /// and are not retried internally.
    fn initialize(&mut self, name: &str, create: bool) -> Result<()>;

    /// Transfer exactly one message to the peer
    ///
    /// Blocks until the transport has accepted the message: for the
    /// single-slot mailbox backends this means the previous message was
    /// consumed; for the byte-channel backends it means the bytes were
    /// written. Interrupted system calls are retried internally.
    fn send_message(&mut self, msg: &Message) -> Result<()>;

    /// Block until one message is available and return it by value
    fn receive_message(&mut self) -> Result<Message>;

    /// Release every OS resource this instance holds
    ///
    /// Idempotent; also runs on drop so no exit path leaks resources. Only
    /// the owner removes the named resource from the system namespace, a
    /// non-owner merely detaches its local view.
    fn cleanup(&mut self);
}

/// Available transport mechanisms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// Named pipe (FIFO) pair, one per direction
    Pipe,
    /// Shared-memory mailbox with a process-shared lock and condition variable
    SharedMemory,
    /// Shared-memory mailbox notified via SIGUSR1 to a known peer pid
    Signal,
    /// POSIX message queue pair, one per direction
    MessageQueue,
    /// TCP stream socket, addressed as `host:port`
    Socket,
}

impl TransportKind {
    /// Parse a mechanism name; `None` for unrecognized mechanisms
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pipe" => Some(Self::Pipe),
            "shm" | "shared-memory" => Some(Self::SharedMemory),
            "signal" => Some(Self::Signal),
            "mq" | "message-queue" => Some(Self::MessageQueue),
            "socket" => Some(Self::Socket),
            _ => None,
        }
    }

    /// Canonical mechanism name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pipe => "pipe",
            Self::SharedMemory => "shared-memory",
            Self::Signal => "signal",
            Self::MessageQueue => "message-queue",
            Self::Socket => "socket",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
