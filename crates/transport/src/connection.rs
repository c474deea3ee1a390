//! A live session with a remote `rmt` helper.
//!
//! The connection owns both directions of the byte channel plus the child
//! process handle when the channel is a pipe pair. Both halves are trait
//! objects so alternate transports — the rexec socket, or in-memory mocks in
//! tests — plug into the same session machinery.

use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout};

use tracing::trace;

use crate::sigpipe::SigPipeGuard;

/// One established remote-tape session.
///
/// The reading half produces data from the remote helper; the writing half
/// accepts command lines and write payloads. Dropping the connection closes
/// both halves, which a pipe-backed child observes as EOF on its stdin and
/// exits on. The child is deliberately not reaped here — SIGCHLD handling
/// belongs to the surrounding program.
pub struct Connection {
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
    child: Option<Child>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("child", &self.child)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Wraps a spawned remote-shell child and its pipe halves.
    #[must_use]
    pub fn from_child(child: Child, stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self {
            reader: Box::new(stdout),
            writer: Box::new(stdin),
            child: Some(child),
        }
    }

    /// Builds a connection from arbitrary endpoints.
    ///
    /// This is the seam used by the rexec transport (both halves are clones
    /// of one socket) and by tests that script the remote side in memory.
    #[must_use]
    pub fn from_parts(reader: Box<dyn Read + Send>, writer: Box<dyn Write + Send>) -> Self {
        Self {
            reader,
            writer,
            child: None,
        }
    }

    /// Process id of the pipe-backed child, when there is one.
    #[must_use]
    pub fn child_id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Transmits one complete command line.
    ///
    /// SIGPIPE is held ignored for the duration so a vanished peer surfaces
    /// as `EPIPE` instead of killing the process. Anything short of a full
    /// write is an error; the caller must shut the session down, because the
    /// peer may have consumed a partial command.
    ///
    /// # Errors
    ///
    /// The underlying write or flush error.
    pub fn send_command(&mut self, command: &[u8]) -> io::Result<()> {
        let _guard = SigPipeGuard::ignore()?;
        self.writer.write_all(command)?;
        self.writer.flush()
    }

    /// Transmits a write payload, returning how many bytes actually left.
    ///
    /// Unlike [`send_command`](Self::send_command) a short transfer is not an
    /// error here: the caller needs the completed byte count to report to the
    /// archive layer before tearing the session down.
    ///
    /// # Errors
    ///
    /// Only guard installation can fail; transfer failures are reported
    /// through a short count.
    pub fn write_payload(&mut self, payload: &[u8]) -> io::Result<usize> {
        let _guard = SigPipeGuard::ignore()?;
        let mut written = 0;
        while written < payload.len() {
            match self.writer.write(&payload[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => break,
            }
        }
        // Pipe endpoints are unbuffered; flushing matters only for mock
        // writers and cannot retroactively unsend bytes.
        let _ = self.writer.flush();
        Ok(written)
    }

    /// Reads exactly `buf.len()` payload bytes from the remote.
    ///
    /// # Errors
    ///
    /// `UnexpectedEof` when the stream ends early, or the underlying read
    /// error; either way the session is no longer usable.
    pub fn read_payload(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.reader.read_exact(buf)
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(child) = &self.child {
            trace!(pid = child.id(), "closing remote tape session");
        }
        // Dropping the halves closes the pipes; the child sees EOF and
        // exits on its own. No kill, no wait.
    }
}
