//! Scoped SIGPIPE suppression.
//!
//! Writing a command to a remote child that has already exited would kill the
//! whole archive program with SIGPIPE. The historical clients flip the signal
//! to `SIG_IGN` around each write and restore the previous handler
//! afterwards, turning a dead peer into a clean `EPIPE` error return. The
//! guard here does the same with RAII scoping, so the previous disposition is
//! restored on every exit path, unwinding included. Callers must not rely on
//! the disposition being stable while a write is in flight.

#![allow(unsafe_code)]

use std::io;
use std::mem;

/// RAII guard holding SIGPIPE at `SIG_IGN`.
///
/// Constructed immediately before a transport write and dropped immediately
/// after; the saved disposition is reinstated on drop.
pub struct SigPipeGuard {
    previous: libc::sigaction,
}

impl SigPipeGuard {
    /// Ignores SIGPIPE, remembering the current disposition.
    ///
    /// # Errors
    ///
    /// Returns the underlying errno if the signal disposition cannot be
    /// changed, which indicates a seriously broken process state.
    pub fn ignore() -> io::Result<Self> {
        // SAFETY: `sigaction` is zero-initialisable; both pointers reference
        // locals that live across the call, and SIG_IGN installs no handler
        // code that could violate async-signal-safety.
        unsafe {
            let mut ignore: libc::sigaction = mem::zeroed();
            ignore.sa_sigaction = libc::SIG_IGN;
            libc::sigemptyset(&mut ignore.sa_mask);

            let mut previous: libc::sigaction = mem::zeroed();
            if libc::sigaction(libc::SIGPIPE, &ignore, &mut previous) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Self { previous })
        }
    }
}

impl Drop for SigPipeGuard {
    fn drop(&mut self) {
        // SAFETY: `previous` was produced by sigaction for this same signal;
        // restoration failure leaves SIGPIPE ignored, which is the safe
        // direction, and there is no way to report it from a destructor.
        unsafe {
            let _ = libc::sigaction(libc::SIGPIPE, &self.previous, std::ptr::null_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_disposition() -> libc::sighandler_t {
        // SAFETY: querying with a null new-action pointer only reads state.
        unsafe {
            let mut current: libc::sigaction = mem::zeroed();
            assert_eq!(
                libc::sigaction(libc::SIGPIPE, std::ptr::null(), &mut current),
                0
            );
            current.sa_sigaction
        }
    }

    #[test]
    fn guard_ignores_and_restores() {
        let before = current_disposition();

        {
            let _guard = SigPipeGuard::ignore().expect("sigaction");
            assert_eq!(current_disposition(), libc::SIG_IGN);
        }

        assert_eq!(current_disposition(), before);
    }

    #[test]
    fn guard_restores_across_unwinding() {
        let before = current_disposition();

        let result = std::panic::catch_unwind(|| {
            let _guard = SigPipeGuard::ignore().expect("sigaction");
            panic!("forced unwind");
        });
        assert!(result.is_err());

        assert_eq!(current_disposition(), before);
    }

    #[test]
    fn nested_guards_unwind_in_order() {
        let before = current_disposition();
        {
            let _outer = SigPipeGuard::ignore().expect("sigaction");
            {
                let _inner = SigPipeGuard::ignore().expect("sigaction");
                assert_eq!(current_disposition(), libc::SIG_IGN);
            }
            assert_eq!(current_disposition(), libc::SIG_IGN);
        }
        assert_eq!(current_disposition(), before);
    }
}
