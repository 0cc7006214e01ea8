//! msgport - Core Module
//!
//! Message type, transport contract, and error types shared by every
//! backend crate.

pub mod error;
pub mod message;
pub mod transport;

pub use error::*;
pub use message::*;
pub use transport::*;

/// Current version of the msgport protocol
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
