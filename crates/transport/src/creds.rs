//! Privilege reset for the remote-shell child.
//!
//! Archive programs are sometimes installed set-uid so they can read raw
//! devices. The remote shell must not inherit that: between fork and exec
//! the child re-initialises its supplementary groups from the real user's
//! passwd entry and resets effective gid/uid to the real ones. `EPERM` is
//! tolerated throughout — an unprivileged process cannot change its ids and
//! does not need to.

#![allow(unsafe_code)]

use std::ffi::CStr;
use std::io;
use std::mem::MaybeUninit;
use std::ptr;

/// Resets effective user and group ids to the real ones.
///
/// Runs in the forked child (from a `pre_exec` hook), mirroring the
/// historical sequence: look up the real uid's passwd entry, reinitialise
/// supplementary groups from that name with the real gid, then set the real
/// gid and uid when the effective ones differ.
///
/// # Errors
///
/// Any failure other than `EPERM` aborts the spawn with the underlying
/// errno. A missing passwd entry reports `ENOENT`.
pub fn reset_real_ids() -> io::Result<()> {
    // SAFETY: these four are simple id queries with no preconditions.
    let (uid, gid, euid, egid) = unsafe {
        (
            libc::getuid(),
            libc::getgid(),
            libc::geteuid(),
            libc::getegid(),
        )
    };

    let name = lookup_passwd_name(uid)?;

    // SAFETY: `name` is a NUL-terminated buffer owned by this frame.
    if unsafe { libc::initgroups(name.as_ptr(), gid) } != 0 {
        tolerate_eperm()?;
    }

    if gid != egid {
        // SAFETY: setgid has no memory preconditions.
        if unsafe { libc::setgid(gid) } != 0 {
            tolerate_eperm()?;
        }
    }

    if uid != euid {
        // SAFETY: setuid has no memory preconditions.
        if unsafe { libc::setuid(uid) } != 0 {
            tolerate_eperm()?;
        }
    }

    Ok(())
}

/// Swallows `EPERM` from the preceding syscall, propagating anything else.
fn tolerate_eperm() -> io::Result<()> {
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EPERM) {
        Ok(())
    } else {
        Err(err)
    }
}

/// Looks up the login name for `uid` with `getpwuid_r`, growing the scratch
/// buffer on `ERANGE`.
///
/// Returns the name as a NUL-terminated byte vector so the caller can hand
/// it straight to `initgroups`.
fn lookup_passwd_name(uid: libc::uid_t) -> io::Result<Vec<libc::c_char>> {
    let mut buffer = vec![0u8; 1024];
    loop {
        let mut pwd = MaybeUninit::<libc::passwd>::zeroed();
        let mut result: *mut libc::passwd = ptr::null_mut();
        // SAFETY: all pointers reference live buffers owned by this frame;
        // getpwuid_r writes the entry into `pwd` backed by `buffer` and sets
        // `result` to null when no entry exists.
        let errno = unsafe {
            libc::getpwuid_r(
                uid,
                pwd.as_mut_ptr(),
                buffer.as_mut_ptr().cast::<libc::c_char>(),
                buffer.len(),
                &mut result,
            )
        };

        if errno == 0 {
            if result.is_null() {
                // No passwd entry for the real uid.
                return Err(io::Error::from_raw_os_error(libc::ENOENT));
            }

            // SAFETY: `result` is non-null, so `pwd` was initialised and
            // `pw_name` points at a NUL-terminated string backed by `buffer`.
            let name = unsafe { CStr::from_ptr(pwd.assume_init().pw_name) };
            let mut owned: Vec<libc::c_char> =
                name.to_bytes_with_nul().iter().map(|&b| b as libc::c_char).collect();
            owned.shrink_to_fit();
            return Ok(owned);
        }

        if errno == libc::ERANGE {
            buffer.resize(buffer.len().saturating_mul(2), 0);
            continue;
        }

        return Err(io::Error::from_raw_os_error(errno));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_uid_has_a_passwd_name() {
        // SAFETY: plain id query.
        let uid = unsafe { libc::getuid() };
        let name = lookup_passwd_name(uid).expect("current uid must have a passwd entry");
        assert!(name.len() > 1, "name should be non-empty plus NUL");
        assert_eq!(*name.last().unwrap(), 0);
    }

    #[test]
    fn unknown_uid_reports_no_entry() {
        match lookup_passwd_name(u32::MAX - 7) {
            Err(err) => assert_eq!(err.raw_os_error(), Some(libc::ENOENT)),
            // Some NSS setups synthesise entries for any uid; nothing to
            // assert in that case.
            Ok(_) => {}
        }
    }

    #[test]
    fn reset_is_a_no_op_without_privilege() {
        // Running unprivileged, real and effective ids already match, so the
        // reset must succeed without changing anything.
        reset_real_ids().expect("unprivileged reset succeeds");
        // SAFETY: plain id queries.
        unsafe {
            assert_eq!(libc::getuid(), libc::geteuid());
            assert_eq!(libc::getgid(), libc::getegid());
        }
    }
}
