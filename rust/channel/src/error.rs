//! Byte-channel specific error types

use msgport_core::TransportError;
use thiserror::Error;

/// Byte-channel backend error types
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Malformed `host:port` address string
    #[error("invalid address '{0}': expected host:port")]
    Address(String),

    /// IO failure on a descriptor-backed channel
    #[error("channel IO error: {op}: {source}")]
    Io {
        op: &'static str,
        source: std::io::Error,
    },

    /// POSIX message queue failure
    #[error("message queue error: {op}: {source}")]
    Queue {
        op: &'static str,
        source: nix::Error,
    },

    /// A transfer moved a different number of bytes than one message
    #[error("short transfer: moved {got} bytes, expected {expected}")]
    ShortTransfer { got: usize, expected: usize },

    /// The peer closed the channel
    #[error("peer disconnected")]
    Disconnected,

    /// Operation on a transport that was never initialized
    #[error("transport not initialized")]
    NotInitialized,
}

/// Convenience type alias
pub type Result<T> = std::result::Result<T, ChannelError>;

impl ChannelError {
    pub(crate) fn io(op: &'static str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset => ChannelError::Disconnected,
            _ => ChannelError::Io { op, source },
        }
    }

    pub(crate) fn queue(op: &'static str, source: nix::Error) -> Self {
        ChannelError::Queue { op, source }
    }
}

impl From<ChannelError> for TransportError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Address(addr) => TransportError::InvalidAddress(addr),
            ChannelError::Disconnected => TransportError::Disconnected,
            ChannelError::NotInitialized => TransportError::NotInitialized,
            other => TransportError::Channel(other.to_string()),
        }
    }
}
