//! POSIX message queue transport
//!
//! Two queues are derived from the base name, one per direction: the
//! creator sends on the forward queue and receives on the reverse queue,
//! the peer mirrored. Every message is sent at priority zero so the
//! queues deliver in strict FIFO order.

use crate::{ChannelError, Result};
use msgport_core::{Message, Transport};
use nix::mqueue::{mq_close, mq_open, mq_receive, mq_send, mq_unlink, MQ_OFlag, MqAttr, MqdT};
use nix::sys::stat::Mode;
use tracing::{debug, warn};

/// Maximum queued messages per direction
const QUEUE_DEPTH: i64 = 10;

/// Message queue pair transport
pub struct MsgQueueTransport {
    tx: Option<MqdT>,
    rx: Option<MqdT>,
    tx_name: String,
    rx_name: String,
    is_creator: bool,
}

impl MsgQueueTransport {
    pub fn new() -> Self {
        Self {
            tx: None,
            rx: None,
            tx_name: String::new(),
            rx_name: String::new(),
            is_creator: false,
        }
    }

    /// Forward (creator-to-peer) and reverse queue names; POSIX queue
    /// names require a leading slash
    fn queue_names(name: &str) -> (String, String) {
        let base = name.trim_start_matches('/');
        (format!("/{base}_fwd"), format!("/{base}_rev"))
    }

    fn open_queue(name: &str, create: bool) -> Result<MqdT> {
        let (flags, attr) = if create {
            (
                MQ_OFlag::O_CREAT | MQ_OFlag::O_RDWR,
                Some(MqAttr::new(0, QUEUE_DEPTH, Message::WIRE_SIZE as i64, 0)),
            )
        } else {
            (MQ_OFlag::O_RDWR, None)
        };

        mq_open(name, flags, Mode::S_IRUSR | Mode::S_IWUSR, attr.as_ref())
            .map_err(|e| ChannelError::queue("mq_open", e))
    }

    fn init(&mut self, name: &str, create: bool) -> Result<()> {
        let (fwd, rev) = Self::queue_names(name);
        self.is_creator = create;

        if create {
            // Ensure a clean start; stale queues keep old messages
            let _ = mq_unlink(fwd.as_str());
            let _ = mq_unlink(rev.as_str());
        }

        let fwd_q = Self::open_queue(&fwd, create)?;
        let rev_q = Self::open_queue(&rev, create)?;

        if create {
            self.tx = Some(fwd_q);
            self.rx = Some(rev_q);
            self.tx_name = fwd;
            self.rx_name = rev;
        } else {
            self.tx = Some(rev_q);
            self.rx = Some(fwd_q);
            self.tx_name = rev;
            self.rx_name = fwd;
        }

        debug!(tx = %self.tx_name, rx = %self.rx_name, "message queue pair ready");
        Ok(())
    }

    fn send(&mut self, msg: &Message) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(ChannelError::NotInitialized)?;
        let bytes = msg.to_bytes();
        loop {
            match mq_send(tx, &bytes, 0) {
                Ok(()) => return Ok(()),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(ChannelError::queue("mq_send", e)),
            }
        }
    }

    fn receive(&mut self) -> Result<Message> {
        let rx = self.rx.as_ref().ok_or(ChannelError::NotInitialized)?;
        let mut bytes = [0u8; Message::WIRE_SIZE];
        let mut priority = 0u32;
        let received = loop {
            match mq_receive(rx, &mut bytes, &mut priority) {
                Ok(n) => break n,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(ChannelError::queue("mq_receive", e)),
            }
        };
        if received != Message::WIRE_SIZE {
            return Err(ChannelError::ShortTransfer {
                got: received,
                expected: Message::WIRE_SIZE,
            });
        }
        Ok(Message::from_bytes(&bytes))
    }
}

impl Default for MsgQueueTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MsgQueueTransport {
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
        for queue in [self.tx.take(), self.rx.take()].into_iter().flatten() {
            if let Err(err) = mq_close(queue) {
                warn!("mq_close failed: {err}");
            }
        }
        if self.is_creator {
            self.is_creator = false;
            for name in [&self.tx_name, &self.rx_name] {
                if name.is_empty() {
                    continue;
                }
                if let Err(err) = mq_unlink(name.as_str()) {
                    warn!(queue = %name, "mq_unlink failed: {err}");
                } else {
                    debug!(queue = %name, "unlinked message queue");
                }
            }
        }
    }
}

impl Drop for MsgQueueTransport {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!("msgport_mq_{tag}_{}", std::process::id())
    }

    #[test]
    fn test_send_before_initialize_fails() {
        let mut transport = MsgQueueTransport::new();
        assert!(transport.send_message(&Message::new()).is_err());
    }

    #[test]
    fn test_attach_missing_queues_fails() {
        let mut transport = MsgQueueTransport::new();
        assert!(transport.initialize(&unique_name("missing"), false).is_err());
    }

    #[test]
    fn test_same_process_fifo_ordering() {
        let name = unique_name("order");
        let mut creator = MsgQueueTransport::new();
        creator.initialize(&name, true).unwrap();
        let mut peer = MsgQueueTransport::new();
        peer.initialize(&name, false).unwrap();

        for counter in 0..5 {
            let mut msg = Message::with_counter(counter);
            msg.set_payload(format!("msg {counter}").as_bytes()).unwrap();
            creator.send_message(&msg).unwrap();
        }
        for counter in 0..5 {
            let msg = peer.receive_message().unwrap();
            assert_eq!(msg.counter, counter);
            assert_eq!(msg.payload_text(), format!("msg {counter}"));
        }

        peer.cleanup();
        creator.cleanup();
    }

    #[test]
    fn test_creator_cleanup_unlinks_queues() {
        let name = unique_name("unlink");
        let mut creator = MsgQueueTransport::new();
        creator.initialize(&name, true).unwrap();
        creator.cleanup();

        let mut peer = MsgQueueTransport::new();
        assert!(peer.initialize(&name, false).is_err());
    }
}
