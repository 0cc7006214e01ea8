//! Error types shared by every transport backend

use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// IO errors from the byte-channel backends
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Mailbox backend errors (shared memory, signal notification)
    #[error("mailbox error: {0}")]
    Mailbox(String),

    /// Byte-channel backend errors (pipe, queue, socket)
    #[error("channel error: {0}")]
    Channel(String),

    /// Malformed `host:port` address string
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Operation requires the peer process identity, which was never set
    #[error("peer identity not set")]
    PeerUnknown,

    /// Operation on a transport that was never initialized
    #[error("transport not initialized")]
    NotInitialized,

    /// The peer closed the channel mid-exchange
    #[error("peer disconnected")]
    Disconnected,

    /// Invalid message data
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    /// True for failures that end the connection rather than the attempt
    pub fn is_disconnect(&self) -> bool {
        match self {
            TransportError::Disconnected => true,
            TransportError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}
