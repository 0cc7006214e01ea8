//! msgport - Mailbox Module
//!
//! The concurrency-sensitive transports: a shared-memory mailbox
//! synchronized by a process-shared mutex and condition variable, and a
//! signal-notified mailbox synchronized by SIGUSR1 delivery to a known
//! peer process. Both hand exactly one message at a time between two
//! independent processes through a single mapped slot.

pub mod error;
mod pshared;
pub mod region;
pub mod shared_memory;
pub mod signal;

pub use error::*;
pub use region::SharedRegion;
pub use shared_memory::{MailboxSlot, SharedMemoryTransport};
pub use signal::SignalTransport;
