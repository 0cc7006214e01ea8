//! Named pipe (FIFO) transport
//!
//! Two FIFOs are derived from the base name, one per direction, so each
//! FIFO has exactly one writer and one reader and no locking is needed.
//! The creator writes on the first FIFO and reads on the second; the peer
//! is the mirror image. Opening a FIFO blocks until the other end opens,
//! so both sides open their pipes in an order that pairs up.

use crate::{ChannelError, Result};
use msgport_core::{Message, Transport};
use nix::sys::stat::Mode;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

/// FIFO-pair transport
pub struct FifoTransport {
    reader: Option<File>,
    writer: Option<File>,
    paths: Option<(PathBuf, PathBuf)>,
    is_creator: bool,
}

impl FifoTransport {
    pub fn new() -> Self {
        Self {
            reader: None,
            writer: None,
            paths: None,
            is_creator: false,
        }
    }

    fn fifo_paths(name: &str) -> (PathBuf, PathBuf) {
        (
            PathBuf::from(format!("/tmp/{name}_pipe1")),
            PathBuf::from(format!("/tmp/{name}_pipe2")),
        )
    }

    fn init(&mut self, name: &str, create: bool) -> Result<()> {
        let (pipe1, pipe2) = Self::fifo_paths(name);
        self.is_creator = create;
        // Recorded before the blocking opens, so cleanup unlinks the FIFOs
        // even when initialization fails partway
        self.paths = Some((pipe1.clone(), pipe2.clone()));

        if create {
            for path in [&pipe1, &pipe2] {
                match nix::unistd::mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR) {
                    Ok(()) | Err(nix::errno::Errno::EEXIST) => {}
                    Err(err) => {
                        return Err(ChannelError::io(
                            "mkfifo",
                            std::io::Error::from_raw_os_error(err as i32),
                        ))
                    }
                }
            }
            // Creator writes pipe1, reads pipe2; each open blocks until the
            // peer opens the opposite end
            self.writer = Some(
                OpenOptions::new()
                    .write(true)
                    .open(&pipe1)
                    .map_err(|e| ChannelError::io("open write fifo", e))?,
            );
            self.reader =
                Some(File::open(&pipe2).map_err(|e| ChannelError::io("open read fifo", e))?);
        } else {
            self.reader =
                Some(File::open(&pipe1).map_err(|e| ChannelError::io("open read fifo", e))?);
            self.writer = Some(
                OpenOptions::new()
                    .write(true)
                    .open(&pipe2)
                    .map_err(|e| ChannelError::io("open write fifo", e))?,
            );
        }

        debug!(name, creator = create, "fifo pair connected");
        Ok(())
    }

    fn send(&mut self, msg: &Message) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(ChannelError::NotInitialized)?;
        // write_all retries interrupted and partial writes internally
        writer
            .write_all(&msg.to_bytes())
            .map_err(|e| ChannelError::io("write", e))
    }

    fn receive(&mut self) -> Result<Message> {
        let reader = self.reader.as_mut().ok_or(ChannelError::NotInitialized)?;
        let mut bytes = [0u8; Message::WIRE_SIZE];
        reader
            .read_exact(&mut bytes)
            .map_err(|e| ChannelError::io("read", e))?;
        Ok(Message::from_bytes(&bytes))
    }
}

impl Default for FifoTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for FifoTransport {
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
        self.reader = None;
        self.writer = None;
        if let Some((pipe1, pipe2)) = self.paths.take() {
            if self.is_creator {
                for path in [pipe1, pipe2] {
                    if let Err(err) = std::fs::remove_file(&path) {
                        warn!(path = %path.display(), "failed to unlink fifo: {err}");
                    }
                }
            }
        }
    }
}

impl Drop for FifoTransport {
    fn drop(&mut self) {
        self.cleanup();
    }
}
