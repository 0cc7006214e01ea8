//! TCP stream socket transport
//!
//! The owner binds, listens, and accepts exactly one peer; the peer
//! connects. Exactly one message worth of bytes moves per call, with
//! interrupted and partial transfers retried until the full size is moved
//! or the connection is unrecoverably broken.

use crate::{ChannelError, Result};
use msgport_core::{Message, Transport};
use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use tracing::debug;

/// TCP socket transport addressed as `host:port`
pub struct TcpSocketTransport {
    stream: Option<TcpStream>,
    listener: Option<TcpListener>,
    is_server: bool,
}

impl TcpSocketTransport {
    pub fn new() -> Self {
        Self {
            stream: None,
            listener: None,
            is_server: false,
        }
    }

    /// Parse a combined `host:port` address; any malformed component is a
    /// hard failure
    fn parse_address(addr: &str) -> Result<SocketAddr> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| ChannelError::Address(addr.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ChannelError::Address(addr.to_string()))?;
        let ip: IpAddr = host
            .trim_matches(|c| c == '[' || c == ']')
            .parse()
            .map_err(|_| ChannelError::Address(addr.to_string()))?;
        Ok(SocketAddr::new(ip, port))
    }

    fn init(&mut self, addr: &str, create: bool) -> Result<()> {
        let sockaddr = Self::parse_address(addr)?;
        self.is_server = create;

        if create {
            let listener =
                TcpListener::bind(sockaddr).map_err(|e| ChannelError::io("bind", e))?;
            debug!(%sockaddr, "listening for peer");
            let (stream, peer) = listener
                .accept()
                .map_err(|e| ChannelError::io("accept", e))?;
            debug!(%peer, "peer connected");
            self.listener = Some(listener);
            self.stream = Some(stream);
        } else {
            let stream =
                TcpStream::connect(sockaddr).map_err(|e| ChannelError::io("connect", e))?;
            debug!(%sockaddr, "connected to peer");
            self.stream = Some(stream);
        }
        Ok(())
    }

    fn send(&mut self, msg: &Message) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(ChannelError::NotInitialized)?;
        // write_all retries interrupted and partial writes internally
        stream
            .write_all(&msg.to_bytes())
            .map_err(|e| ChannelError::io("send", e))
    }

    fn receive(&mut self) -> Result<Message> {
        let stream = self.stream.as_mut().ok_or(ChannelError::NotInitialized)?;
        let mut bytes = [0u8; Message::WIRE_SIZE];
        // A close mid-message surfaces as UnexpectedEof, a transfer failure
        stream
            .read_exact(&mut bytes)
            .map_err(|e| ChannelError::io("recv", e))?;
        Ok(Message::from_bytes(&bytes))
    }
}

impl Default for TcpSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpSocketTransport {
    fn initialize(&mut self, name: &str, create: bool) -> msgport_core::Result<()> {
        self.init(name, create).map_err(Into::into)
    }

    fn send_message(&mut self, msg: &Message) -> msgport_core::Result<()> {
        self.send(msg).map_err(Into::into)
    }

    fn receive_message(&mut self) -> msgport_core::Result<Message> {
        self.receive().map_err(Into::into)
    }

    fn cleanup(&mut self) {
        self.stream = None;
        self.listener = None;
    }
}

impl Drop for TcpSocketTransport {
    fn drop(&mut self) {
        self.cleanup();
    }
}
