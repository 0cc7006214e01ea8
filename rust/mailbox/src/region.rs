//! POSIX shared memory region holding one value of a fixed type
//!
//! A region is created by exactly one owning process and attached by its
//! peer. The owner removes the object from the system namespace on close;
//! a non-owner only unmaps its local view, so it can never destroy a region
//! the peer still needs.

use crate::{MailboxError, Result};
use nix::fcntl::OFlag;
use nix::sys::mman::{self, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use std::num::NonZeroUsize;
use std::os::fd::{AsRawFd, OwnedFd};
use std::ptr::NonNull;
use tracing::{debug, warn};

/// Mapped shared memory region containing a single `T`
pub struct SharedRegion<T> {
    /// Name of the POSIX shared memory object, with leading slash
    name: String,
    /// Mapping, present until `close`
    ptr: Option<NonNull<T>>,
    /// Backing file descriptor, held open until `close`
    fd: Option<OwnedFd>,
    /// Whether this process created the object and must unlink it
    is_owner: bool,
}

impl<T> SharedRegion<T> {
    /// Create a new shared memory object sized for one `T` and map it
    pub fn create(name: &str) -> Result<Self> {
        let name = shm_object_name(name);
        let fd = mman::shm_open(
            name.as_str(),
            OFlag::O_CREAT | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .map_err(|e| MailboxError::region("shm_open", e))?;

        nix::unistd::ftruncate(&fd, std::mem::size_of::<T>() as i64)
            .map_err(|e| MailboxError::region("ftruncate", e))?;

        let ptr = map_region::<T>(&fd)?;
        debug!(region = %name, size = std::mem::size_of::<T>(), "created shared memory region");

        Ok(Self {
            name,
            ptr: Some(ptr),
            fd: Some(fd),
            is_owner: true,
        })
    }

    /// Attach to a shared memory object the peer already created
    pub fn attach(name: &str) -> Result<Self> {
        let name = shm_object_name(name);
        let fd = mman::shm_open(name.as_str(), OFlag::O_RDWR, Mode::empty())
            .map_err(|e| MailboxError::region("shm_open", e))?;

        let stat = nix::sys::stat::fstat(fd.as_raw_fd())
            .map_err(|e| MailboxError::region("fstat", e))?;
        if (stat.st_size as usize) < std::mem::size_of::<T>() {
            return Err(MailboxError::region(
                "attach: region smaller than expected",
                nix::errno::Errno::EINVAL,
            ));
        }

        let ptr = map_region::<T>(&fd)?;
        debug!(region = %name, "attached to shared memory region");

        Ok(Self {
            name,
            ptr: Some(ptr),
            fd: Some(fd),
            is_owner: false,
        })
    }

    /// Name of the underlying shared memory object
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this instance owns (and will unlink) the object
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// Pointer to the mapped value, `None` once closed
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    /// Unmap, close, and (for the owner) unlink the object
    ///
    /// Idempotent; every release step runs regardless of earlier failures.
    pub fn close(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            let len = std::mem::size_of::<T>();
            if let Err(err) = unsafe { mman::munmap(ptr.as_ptr().cast(), len) } {
                warn!(region = %self.name, "munmap failed: {err}");
            }
        }
        // Dropping the descriptor closes it
        self.fd = None;
        if self.is_owner {
            self.is_owner = false;
            if let Err(err) = mman::shm_unlink(self.name.as_str()) {
                warn!(region = %self.name, "shm_unlink failed: {err}");
            } else {
                debug!(region = %self.name, "unlinked shared memory region");
            }
        }
    }
}

impl<T> Drop for SharedRegion<T> {
    fn drop(&mut self) {
        self.close();
    }
}

// Safety: the mapping stays valid until close, and all access to the shared
// value goes through raw pointers synchronized by the caller
unsafe impl<T> Send for SharedRegion<T> {}

fn map_region<T>(fd: &OwnedFd) -> Result<NonNull<T>> {
    let len = NonZeroUsize::new(std::mem::size_of::<T>())
        .ok_or(MailboxError::region("mmap: zero-sized region", nix::errno::Errno::EINVAL))?;
    let ptr = unsafe {
        mman::mmap(
            None,
            len,
            ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
            MapFlags::MAP_SHARED,
            Some(fd),
            0,
        )
    }
    .map_err(|e| MailboxError::region("mmap", e))?;

    NonNull::new(ptr.cast())
        .ok_or(MailboxError::region("mmap returned null", nix::errno::Errno::EFAULT))
}

/// POSIX shared memory object names must carry exactly one leading slash
fn shm_object_name(name: &str) -> String {
    let trimmed = name.trim_start_matches('/');
    format!("/{trimmed}")
}
