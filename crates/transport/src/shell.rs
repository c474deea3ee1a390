//! Remote-shell invocation.
//!
//! A session is established by running a remote-login program (`rsh`, `ssh`,
//! or a site-local equivalent) with the remote host, an optional `-l user`,
//! and the path of the `rmt` helper to execute over there. The child's stdin
//! and stdout become the session's pipe pair; stderr stays on the caller's
//! terminal so authentication chatter remains visible.

#![allow(unsafe_code)]

use std::ffi::{OsStr, OsString};
use std::io;
use std::net::ToSocketAddrs;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::connection::Connection;
use crate::creds;

/// Helper executed on the remote host when the caller does not name one.
pub const DEFAULT_RMT_COMMAND: &str = "/etc/rmt";

/// Exit status a child uses when it dies before `exec` succeeds.
///
/// Kept for callers that reap children and want to distinguish "the remote
/// shell never ran" from "the remote helper returned non-zero". Sessions
/// spawned through this module report exec failures synchronously from
/// [`RemoteShellCommand::spawn`] instead, so the constant is informational.
pub const EXIT_ON_EXEC_ERROR: i32 = 128;

/// Builder for the remote-shell child that carries one tape session.
#[derive(Clone, Debug)]
pub struct RemoteShellCommand {
    program: OsString,
    host: OsString,
    user: Option<OsString>,
    rmt_command: OsString,
}

impl RemoteShellCommand {
    /// Creates a builder running `program` towards `host`.
    #[must_use]
    pub fn new(program: impl Into<OsString>, host: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            host: host.into(),
            user: None,
            rmt_command: OsString::from(DEFAULT_RMT_COMMAND),
        }
    }

    /// Logs in as `user` on the remote side (`-l user`).
    pub fn set_user<S: Into<OsString>>(&mut self, user: Option<S>) -> &mut Self {
        self.user = user.map(Into::into);
        self
    }

    /// Overrides the helper executed on the remote host.
    pub fn set_rmt_command<S: Into<OsString>>(&mut self, command: S) -> &mut Self {
        self.rmt_command = command.into();
        self
    }

    /// Spawns the child and wires its stdio into a [`Connection`].
    ///
    /// The child's argv matches the historical clients:
    /// `[basename, host, ("-l", user)?, rmt-command]`, with argv\[0\] set to
    /// the program's basename. Between fork and exec the child resets its
    /// effective ids to the real user (see [`creds::reset_real_ids`]).
    ///
    /// # Errors
    ///
    /// Spawn, pipe, privilege-reset and exec failures all surface here with
    /// their underlying errno.
    pub fn spawn(&self) -> io::Result<Connection> {
        let mut command = Command::new(&self.program);
        command.arg0(basename(&self.program));
        command.arg(&self.host);
        if let Some(user) = &self.user {
            command.arg("-l").arg(user);
        }
        command.arg(&self.rmt_command);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        // SAFETY: the hook runs in the forked child before exec. It performs
        // id syscalls and a passwd lookup, the same calls the historical
        // child made at this point; the parent is expected to be
        // single-threaded while opening tape sessions.
        unsafe {
            command.pre_exec(creds::reset_real_ids);
        }

        let mut child = command.spawn()?;
        debug!(
            program = %self.program.to_string_lossy(),
            host = %self.host.to_string_lossy(),
            pid = child.id(),
            "spawned remote shell"
        );

        let stdin = child.stdin.take().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                "remote shell did not expose a writable stdin",
            )
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                "remote shell did not expose a readable stdout",
            )
        })?;

        Ok(Connection::from_child(child, stdin, stdout))
    }

    fn command_parts(&self) -> (OsString, Vec<OsString>) {
        let mut args = vec![self.host.clone()];
        if let Some(user) = &self.user {
            args.push(OsString::from("-l"));
            args.push(user.clone());
        }
        args.push(self.rmt_command.clone());
        (self.program.clone(), args)
    }

    #[cfg(test)]
    pub(crate) fn command_parts_for_testing(&self) -> (OsString, Vec<OsString>) {
        self.command_parts()
    }
}

/// Best-effort resolution of the remote host name.
///
/// The protocol itself never needs an address — the remote shell does its own
/// connecting — but resolving up front turns a typoed host into a prompt
/// error instead of a remote-shell failure after fork.
///
/// # Errors
///
/// The resolver's error for an unknown or unresolvable host.
pub fn resolve_host(host: &str) -> io::Result<()> {
    (host, 0u16).to_socket_addrs().map(|_| ())
}

fn basename(program: &OsStr) -> &OsStr {
    Path::new(program).file_name().unwrap_or(program)
}
