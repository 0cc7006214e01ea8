//! Raw process-shared pthread mutex and condition variable operations
//!
//! Ordinary Rust synchronization primitives have undefined behavior when
//! the same instance is used from independent processes mapping the same
//! memory, so the mailbox slot embeds raw `pthread_mutex_t` /
//! `pthread_cond_t` objects initialized with `PTHREAD_PROCESS_SHARED`.
//! All operations take raw pointers into the mapped region; callers must
//! guarantee the pointers stay valid for the duration of the call.

use crate::{MailboxError, Result};
use std::mem::MaybeUninit;

fn check(op: &'static str, code: libc::c_int) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(MailboxError::Sync {
            op,
            source: std::io::Error::from_raw_os_error(code),
        })
    }
}

/// Initialize a mutex in shared memory for cross-process use
///
/// Must run exactly once, by the owning process, before any peer attaches.
pub(crate) unsafe fn init_mutex(mutex: *mut libc::pthread_mutex_t) -> Result<()> {
    let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
    check("pthread_mutexattr_init", libc::pthread_mutexattr_init(attr.as_mut_ptr()))?;
    let result = check(
        "pthread_mutexattr_setpshared",
        libc::pthread_mutexattr_setpshared(attr.as_mut_ptr(), libc::PTHREAD_PROCESS_SHARED),
    )
    .and_then(|_| check("pthread_mutex_init", libc::pthread_mutex_init(mutex, attr.as_ptr())));
    libc::pthread_mutexattr_destroy(attr.as_mut_ptr());
    result
}

/// Initialize a condition variable in shared memory for cross-process use
pub(crate) unsafe fn init_cond(cond: *mut libc::pthread_cond_t) -> Result<()> {
    let mut attr = MaybeUninit::<libc::pthread_condattr_t>::uninit();
    check("pthread_condattr_init", libc::pthread_condattr_init(attr.as_mut_ptr()))?;
    let result = check(
        "pthread_condattr_setpshared",
        libc::pthread_condattr_setpshared(attr.as_mut_ptr(), libc::PTHREAD_PROCESS_SHARED),
    )
    .and_then(|_| check("pthread_cond_init", libc::pthread_cond_init(cond, attr.as_ptr())));
    libc::pthread_condattr_destroy(attr.as_mut_ptr());
    result
}

pub(crate) unsafe fn lock(mutex: *mut libc::pthread_mutex_t) -> Result<()> {
    check("pthread_mutex_lock", libc::pthread_mutex_lock(mutex))
}

pub(crate) unsafe fn unlock(mutex: *mut libc::pthread_mutex_t) -> Result<()> {
    check("pthread_mutex_unlock", libc::pthread_mutex_unlock(mutex))
}

/// Wait on the condition variable, releasing the mutex while blocked
///
/// Callers must re-check their predicate after every wakeup.
pub(crate) unsafe fn wait(
    cond: *mut libc::pthread_cond_t,
    mutex: *mut libc::pthread_mutex_t,
) -> Result<()> {
    check("pthread_cond_wait", libc::pthread_cond_wait(cond, mutex))
}

pub(crate) unsafe fn notify(cond: *mut libc::pthread_cond_t) -> Result<()> {
    check("pthread_cond_signal", libc::pthread_cond_signal(cond))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_lock_unlock() {
        let mut mutex = MaybeUninit::<libc::pthread_mutex_t>::uninit();
        let mut cond = MaybeUninit::<libc::pthread_cond_t>::uninit();
        unsafe {
            init_mutex(mutex.as_mut_ptr()).unwrap();
            init_cond(cond.as_mut_ptr()).unwrap();
            lock(mutex.as_mut_ptr()).unwrap();
            notify(cond.as_mut_ptr()).unwrap();
            unlock(mutex.as_mut_ptr()).unwrap();
            libc::pthread_cond_destroy(cond.as_mut_ptr());
            libc::pthread_mutex_destroy(mutex.as_mut_ptr());
        }
    }
}
