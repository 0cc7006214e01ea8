//! Mailbox-specific error types

use msgport_core::TransportError;
use thiserror::Error;

/// Mailbox backend error types
#[derive(Error, Debug)]
pub enum MailboxError {
    /// Shared memory object allocation or mapping failure
    #[error("shared memory region error: {op}: {source}")]
    Region {
        op: &'static str,
        source: nix::Error,
    },

    /// Process-shared mutex or condition variable failure
    #[error("synchronization error: {op}: {source}")]
    Sync {
        op: &'static str,
        source: std::io::Error,
    },

    /// Signal delivery or wait failure
    #[error("signal error: {op}: {source}")]
    Signal {
        op: &'static str,
        source: nix::Error,
    },

    /// Send attempted before the peer process identity was recorded
    #[error("peer process identity not set")]
    PeerUnknown,

    /// Operation on a transport that was never initialized
    #[error("transport not initialized")]
    NotInitialized,
}

/// Convenience type alias
pub type Result<T> = std::result::Result<T, MailboxError>;

impl MailboxError {
    pub(crate) fn region(op: &'static str, source: nix::Error) -> Self {
        MailboxError::Region { op, source }
    }

    pub(crate) fn signal(op: &'static str, source: nix::Error) -> Self {
        MailboxError::Signal { op, source }
    }
}

impl From<MailboxError> for TransportError {
    fn from(err: MailboxError) -> Self {
        match err {
            MailboxError::PeerUnknown => TransportError::PeerUnknown,
            MailboxError::NotInitialized => TransportError::NotInitialized,
            other => TransportError::Mailbox(other.to_string()),
        }
    }
}
