//! Completion handle (§4.3, §6): an OS descriptor with eventfd semantics —
//! "write one token -> becomes readable; read N tokens -> drains" — that a
//! host reactor can register directly. We never substitute an in-process
//! channel for this, per §9: the contract exists so the caller's own
//! epoll/kqueue/poll loop can wait on it without a translation layer.

use std::os::unix::io::RawFd;

use crate::error::Result;

/// A nonblocking, close-on-exec eventfd (Linux) or self-pipe fallback
/// (other unix) that becomes readable exactly once per completed request.
pub struct CompletionHandle {
    fd: RawFd,
    #[cfg(not(target_os = "linux"))]
    write_fd: RawFd,
}

impl CompletionHandle {
    #[cfg(target_os = "linux")]
    pub fn new() -> Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(CompletionHandle { fd })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn new() -> Result<Self> {
        let mut fds = [0i32; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        for fd in fds {
            unsafe {
                let flags = libc::fcntl(fd, libc::F_GETFL, 0);
                libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC);
            }
        }
        Ok(CompletionHandle { fd: fds[0], write_fd: fds[1] })
    }

    /// Writes one token, making the handle readable. Called exactly once
    /// per request by [`crate::request::Request::complete`].
    #[cfg(target_os = "linux")]
    pub(crate) fn signal(&self) -> std::io::Result<()> {
        let one: u64 = 1;
        let rc = unsafe {
            libc::write(self.fd, &one as *const u64 as *const _, std::mem::size_of::<u64>())
        };
        if rc < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    pub(crate) fn signal(&self) -> std::io::Result<()> {
        let byte: u8 = 1;
        let rc = unsafe { libc::write(self.write_fd, &byte as *const u8 as *const _, 1) };
        if rc < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    /// Drains the handle. Callers must do this before releasing the
    /// request to avoid leaking a stale readable state on fd reuse (§6).
    /// Returns `Ok(true)` if a token was read, `Ok(false)` if the handle
    /// was not yet readable (`EAGAIN`).
    pub fn drain(&self) -> std::io::Result<bool> {
        let mut buf = [0u8; 8];
        let rc = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut _, buf.len()) };
        if rc >= 0 {
            return Ok(true);
        }
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::WouldBlock {
            return Ok(false);
        }
        Err(err)
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
            #[cfg(not(target_os = "linux"))]
            libc::close(self.write_fd);
        }
    }
}

// Safety: the fd is only touched through the read/write syscalls above,
// which are safe to call from any thread.
unsafe impl Send for CompletionHandle {}
unsafe impl Sync for CompletionHandle {}
