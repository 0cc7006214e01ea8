//! Signal-notified mailbox transport
//!
//! The shared region holds one bare message with no embedded lock;
//! delivery is announced by sending SIGUSR1 to the recorded peer process.
//! Because the signal carries no payload, the region is the sole data
//! channel: a sender writes the full message before raising the signal,
//! and a receiver copies the region only after observing it.
//!
//! Notifications are consumed with a synchronous `sigwait` on a set that
//! was blocked during `initialize`. A blocked signal raised before the
//! receiver reaches the wait stays pending and is still delivered, so the
//! notify-before-wait race cannot lose a notification.

use crate::{MailboxError, Result, SharedRegion};
use msgport_core::{Message, Transport};
use nix::sys::signal::{kill, SigSet, Signal};
use nix::unistd::Pid;
use tracing::debug;

/// Notification signal announcing "new data is available"
const NOTIFY_SIGNAL: Signal = Signal::SIGUSR1;

/// Signal-notified mailbox backend
///
/// Steady-state exchange is preconditioned on an identity handshake: each
/// side must record the other's pid via [`set_peer`](Self::set_peer)
/// before its sends can succeed. The recommended protocol carries each
/// side's pid in the `counter` field of its first message.
///
/// `receive_message` waits on the thread that called `initialize`, which
/// is where the notification signal was blocked. Processes with other
/// unrelated threads must keep the signal blocked there too, or delivery
/// may be routed to a thread that is not waiting.
pub struct SignalTransport {
    region: Option<SharedRegion<Message>>,
    peer: Option<Pid>,
}

impl SignalTransport {
    pub fn new() -> Self {
        Self {
            region: None,
            peer: None,
        }
    }

    /// Record the peer process identity used to address notifications
    pub fn set_peer(&mut self, pid: Pid) {
        debug!(peer = pid.as_raw(), "signal mailbox peer recorded");
        self.peer = Some(pid);
    }

    fn notify_set() -> SigSet {
        let mut set = SigSet::empty();
        set.add(NOTIFY_SIGNAL);
        set
    }

    /// Consume notifications still pending on the blocked set, such as one
    /// the peer sent that was never received
    fn drain_pending() {
        let timeout = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        unsafe {
            let mut raw: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut raw);
            libc::sigaddset(&mut raw, NOTIFY_SIGNAL as libc::c_int);
            while libc::sigtimedwait(&raw, std::ptr::null_mut(), &timeout) >= 0 {}
        }
    }

    fn slot(&self) -> Result<*mut Message> {
        self.region
            .as_ref()
            .and_then(|r| r.as_ptr())
            .map(|p| p.as_ptr())
            .ok_or(MailboxError::NotInitialized)
    }

    fn init(&mut self, name: &str, create: bool) -> Result<()> {
        // Block the notification signal before the region becomes
        // attachable, so a peer that races ahead cannot kill this process
        // with an unhandled SIGUSR1
        Self::notify_set()
            .thread_block()
            .map_err(|e| MailboxError::signal("sigprocmask", e))?;

        let region = if create {
            let region = SharedRegion::<Message>::create(name)?;
            let slot = region.as_ptr().ok_or(MailboxError::NotInitialized)?.as_ptr();
            unsafe { slot.write(Message::new()) };
            region
        } else {
            SharedRegion::<Message>::attach(name)?
        };
        debug!(region = %region.name(), owner = create, "signal mailbox ready");
        self.region = Some(region);
        Ok(())
    }

    fn send(&mut self, msg: &Message) -> Result<()> {
        let slot = self.slot()?;
        let peer = self.peer.ok_or(MailboxError::PeerUnknown)?;

        // The write completes before the kill syscall is issued; only the
        // sender writes and only the receiver reads in steady state, so no
        // further ordering guard is needed
        unsafe { slot.write(*msg) };
        kill(peer, NOTIFY_SIGNAL).map_err(|e| MailboxError::signal("kill", e))
    }

    fn receive(&mut self) -> Result<Message> {
        let slot = self.slot()?;

        let set = Self::notify_set();
        loop {
            match set.wait() {
                Ok(_) => break,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(MailboxError::signal("sigwait", e)),
            }
        }

        Ok(unsafe { slot.read() })
    }
}

impl Default for SignalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SignalTransport {
    fn initialize(&mut self, name: &str, create: bool) -> msgport_core::Result<()> {
        self.init(name, create).map_err(Into::into)
    }

    fn send_message(&mut self, msg: &Message) -> msgport_core::Result<()> {
        self.send(msg).map_err(Into::into)
    }

    fn receive_message(&mut self) -> msgport_core::Result<Message> {
        self.receive().map_err(Into::into)
    }

    /// Releases the region and consumes any notification still pending.
    /// The notification signal stays blocked on this thread: unblocking
    /// would hand a pending or late notification to its default
    /// disposition, which terminates the process.
    fn cleanup(&mut self) {
        if self.peer.take().is_some() {
            debug!("signal mailbox peer forgotten");
        }
        if let Some(mut region) = self.region.take() {
            region.close();
            Self::drain_pending();
        }
    }
}

impl Drop for SignalTransport {
    fn drop(&mut self) {
        self.cleanup();
    }
}
