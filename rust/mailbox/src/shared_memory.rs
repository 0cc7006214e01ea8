//! Shared-memory mailbox transport
//!
//! One message slot lives in a mapped region together with a
//! process-shared mutex and condition variable, so both peers synchronize
//! on the same lock instance. The slot is a bounded, capacity-1
//! producer/consumer queue: a sender blocks while the slot is full and a
//! receiver blocks while it is empty, which enforces strict alternation
//! through the slot.

use crate::{pshared, MailboxError, Result, SharedRegion};
use msgport_core::{Message, Transport};
use std::ptr::{addr_of, addr_of_mut, NonNull};
use tracing::debug;

/// Synchronization half of the mailbox slot
///
/// Aligned away from the message so lock traffic does not share a cache
/// line with the payload.
#[repr(C, align(64))]
struct SlotSync {
    mutex: libc::pthread_mutex_t,
    cond: libc::pthread_cond_t,
}

/// One message slot plus its embedded synchronization primitives, placed
/// verbatim in the shared region
#[repr(C)]
pub struct MailboxSlot {
    /// The single unconsumed message; `message.ready` is the slot state
    pub message: Message,
    sync: SlotSync,
}

/// Shared-memory mailbox backend
///
/// The owner must finish `initialize` before the peer attaches: a peer
/// that attaches first observes an uninitialized lock, which is undefined.
/// Callers sequence process startup accordingly.
pub struct SharedMemoryTransport {
    region: Option<SharedRegion<MailboxSlot>>,
}

impl SharedMemoryTransport {
    pub fn new() -> Self {
        Self { region: None }
    }

    /// Direct pointer to the mapped slot, for callers that need to inspect
    /// the shared state; all access must honor the embedded lock
    pub fn shared_slot(&self) -> Option<NonNull<MailboxSlot>> {
        self.region.as_ref().and_then(|r| r.as_ptr())
    }

    fn slot(&self) -> Result<*mut MailboxSlot> {
        self.shared_slot()
            .map(|p| p.as_ptr())
            .ok_or(MailboxError::NotInitialized)
    }

    fn init(&mut self, name: &str, create: bool) -> Result<()> {
        let region = if create {
            let region = SharedRegion::<MailboxSlot>::create(name)?;
            let slot = region.as_ptr().ok_or(MailboxError::NotInitialized)?.as_ptr();
            unsafe {
                pshared::init_mutex(addr_of_mut!((*slot).sync.mutex))?;
                pshared::init_cond(addr_of_mut!((*slot).sync.cond))?;
                addr_of_mut!((*slot).message).write(Message::new());
            }
            region
        } else {
            SharedRegion::<MailboxSlot>::attach(name)?
        };
        debug!(region = %region.name(), owner = create, "shared-memory mailbox ready");
        self.region = Some(region);
        Ok(())
    }

    fn send(&mut self, msg: &Message) -> Result<()> {
        let slot = self.slot()?;
        unsafe {
            let mutex = addr_of_mut!((*slot).sync.mutex);
            let cond = addr_of_mut!((*slot).sync.cond);

            pshared::lock(mutex)?;
            // Wait until the previous message was consumed; the predicate
            // is re-checked after every wakeup, so a stray wakeup cannot
            // overwrite an unconsumed message
            while addr_of!((*slot).message.ready).read() {
                if let Err(err) = pshared::wait(cond, mutex) {
                    let _ = pshared::unlock(mutex);
                    return Err(err);
                }
            }

            (*slot).message.counter = msg.counter;
            (*slot).message.finished = msg.finished;
            (*slot).message.payload = msg.payload;
            (*slot).message.ready = true;

            let notified = pshared::notify(cond);
            pshared::unlock(mutex)?;
            notified
        }
    }

    fn receive(&mut self) -> Result<Message> {
        let slot = self.slot()?;
        unsafe {
            let mutex = addr_of_mut!((*slot).sync.mutex);
            let cond = addr_of_mut!((*slot).sync.cond);

            pshared::lock(mutex)?;
            while !addr_of!((*slot).message.ready).read() {
                if let Err(err) = pshared::wait(cond, mutex) {
                    let _ = pshared::unlock(mutex);
                    return Err(err);
                }
            }

            let mut out = Message::new();
            out.counter = (*slot).message.counter;
            out.finished = (*slot).message.finished;
            out.payload = (*slot).message.payload;
            (*slot).message.ready = false;

            let notified = pshared::notify(cond);
            pshared::unlock(mutex)?;
            notified?;
            Ok(out)
        }
    }
}

impl Default for SharedMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SharedMemoryTransport {
    fn initialize(&mut self, name: &str, create: bool) -> msgport_core::Result<()> {
        self.init(name, create).map_err(Into::into)
    }

    fn send_message(&mut self, msg: &Message) -> msgport_core::Result<()> {
        self.send(msg).map_err(Into::into)
    }

    fn receive_message(&mut self) -> msgport_core::Result<Message> {
        self.receive().map_err(Into::into)
    }

    /// The owner unlinks the shared memory object; a non-owner only unmaps
    /// its view. The embedded mutex and condition variable are not
    /// destroyed, since the peer may still be blocked on them.
    fn cleanup(&mut self) {
        if let Some(mut region) = self.region.take() {
            region.close();
        }
    }
}

impl Drop for SharedMemoryTransport {
    fn drop(&mut self) {
        self.cleanup();
    }
}
