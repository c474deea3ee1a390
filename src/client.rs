//! The operation layer.
//!
//! Each public operation serialises one command, transmits it, parses the
//! status reply and moves any payload bytes — strictly synchronously, one
//! command in flight per session. A session has only two states: usable, or
//! gone. Every framing or I/O violation tears the session down before the
//! error is returned, so callers never observe a half-poisoned handle.
//!
//! Handles taken by these methods are unbiased; the adapter (or whatever
//! sits between the archive engine and this layer) subtracts the open-time
//! bias first.

use std::io::{self, SeekFrom};
use std::path::Path;

use rmt_protocol::mtio::MTGET_SIZE;
use rmt_protocol::{status, Command, MtGet, MtOp, OpenFlags, ProtocolError, Whence};
use rmt_transport::shell::{resolve_host, RemoteShellCommand};
use rmt_transport::{Connection, RemoteEndpoint};
use tracing::{debug, warn};

use crate::session::SessionTable;

/// A tape ioctl request.
///
/// Only the two historical tape ioctls have wire encodings; anything else is
/// rejected locally with "operation not supported" before a single byte is
/// sent.
pub enum IoctlRequest<'a> {
    /// Perform a tape operation (`MTIOCTOP` equivalent).
    TapeOperation(MtOp),
    /// Fill in the drive status structure (`MTIOCGET` equivalent).
    DriveStatus(&'a mut MtGet),
    /// Any other ioctl request number. Always unsupported.
    Other(libc::c_ulong),
}

fn eio() -> io::Error {
    io::Error::from_raw_os_error(libc::EIO)
}

fn bad_handle() -> io::Error {
    io::Error::from_raw_os_error(libc::EBADF)
}

impl SessionTable {
    /// Opens a tape device on a remote host.
    ///
    /// `file_name` has the form `[user@]host:file`. The returned value is
    /// the allocated handle plus `bias`, letting callers distinguish remote
    /// handles from ordinary file descriptors by numeric range; every other
    /// operation expects the unbiased handle.
    ///
    /// `remote_shell` names the transport binary; there is no built-in
    /// default, so an absent value fails the open. `rmt_command` is the
    /// helper executed on the remote host and defaults to
    /// [`rmt_transport::DEFAULT_RMT_COMMAND`].
    ///
    /// # Errors
    ///
    /// "Too many open files" when the table is full, "no such file or
    /// directory" semantics for malformed names, resolver errors for unknown
    /// hosts, spawn errors verbatim, and the decoded errno when the remote
    /// helper refuses the open.
    pub fn open(
        &mut self,
        file_name: &str,
        flags: OpenFlags,
        bias: i32,
        remote_shell: Option<&Path>,
        rmt_command: Option<&str>,
    ) -> io::Result<i32> {
        let handle = self
            .free_slot()
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EMFILE))?;

        let endpoint = RemoteEndpoint::parse(file_name)?;
        resolve_host(endpoint.host())?;

        let shell = remote_shell.ok_or_else(eio)?;

        let mut builder = RemoteShellCommand::new(shell, endpoint.host());
        builder.set_user(endpoint.user());
        if let Some(command) = rmt_command {
            builder.set_rmt_command(command);
        }
        let mut connection = builder.spawn()?;

        let open_command = Command::Open {
            file: endpoint.file(),
            flags,
        }
        .to_wire();
        // Failure past this point drops the connection, closing both pipes;
        // the half-started child exits on the EOF.
        connection.send_command(&open_command).map_err(|_| eio())?;
        status::read_count(&mut connection).map_err(io::Error::from)?;

        self.install(handle, connection);
        debug!(
            handle,
            host = endpoint.host(),
            file = endpoint.file(),
            "remote tape session established"
        );
        Ok(handle as i32 + bias)
    }

    /// Closes a remote tape session.
    ///
    /// The session is shut down whether or not the remote close succeeds;
    /// the return value reports what the remote said.
    ///
    /// # Errors
    ///
    /// `EBADF` for a dead handle, `EIO` for transport failures, or the
    /// peer's errno.
    pub fn close(&mut self, handle: usize) -> io::Result<i64> {
        let mut connection = self.take(handle).ok_or_else(bad_handle)?;

        connection
            .send_command(&Command::Close.to_wire())
            .map_err(|_| eio())?;
        let result = status::read_count(&mut connection);
        drop(connection);
        debug!(handle, "remote tape session closed");
        result.map_err(io::Error::from)
    }

    /// Reads up to `buffer.len()` bytes from the remote tape.
    ///
    /// Returns the number of bytes placed at the front of `buffer`; zero
    /// means end of file, exactly as POSIX `read`.
    ///
    /// # Errors
    ///
    /// `EBADF` for a dead handle; `EIO` with session teardown when the peer
    /// acknowledges more than was asked for or the payload arrives short;
    /// peer errnos verbatim.
    pub fn read(&mut self, handle: usize, buffer: &mut [u8]) -> io::Result<usize> {
        let mut connection = self.take(handle).ok_or_else(bad_handle)?;

        let request = Command::Read {
            count: buffer.len() as u64,
        };
        connection
            .send_command(&request.to_wire())
            .map_err(|_| eio())?;

        let count = match status::read_count(&mut connection) {
            Ok(count) => count,
            Err(err) => return Err(self.dispose(handle, connection, err)),
        };
        if count as u128 > buffer.len() as u128 {
            // The peer promised more than we asked for; the stream can no
            // longer be trusted.
            return Err(eio());
        }

        let count = count as usize;
        connection
            .read_payload(&mut buffer[..count])
            .map_err(|_| eio())?;

        self.put_back(handle, connection);
        Ok(count)
    }

    /// Writes `buffer` to the remote tape.
    ///
    /// Returns the byte count the peer acknowledged. A short acknowledgement
    /// is reported as a short write with the session shut down — the stream
    /// position past a partial tape write is unknowable.
    ///
    /// # Errors
    ///
    /// `EBADF` for a dead handle; `EIO` when the command or payload cannot
    /// be delivered; the peer's errno when it reports a failure instead of a
    /// count (an `E` reply leaves the session usable).
    pub fn write(&mut self, handle: usize, buffer: &[u8]) -> io::Result<usize> {
        let mut connection = self.take(handle).ok_or_else(bad_handle)?;

        let announce = Command::Write {
            count: buffer.len() as u64,
        };
        connection
            .send_command(&announce.to_wire())
            .map_err(|_| eio())?;

        let sent = connection.write_payload(buffer)?;
        if sent < buffer.len() {
            // The pipe broke mid-payload; the session is unusable and there
            // will be no status to read.
            drop(connection);
            return if sent == 0 { Err(eio()) } else { Ok(sent) };
        }

        match status::read_count(&mut connection) {
            Ok(acknowledged) if acknowledged as u128 == buffer.len() as u128 => {
                self.put_back(handle, connection);
                Ok(buffer.len())
            }
            Ok(acknowledged) if (acknowledged as u128) < buffer.len() as u128 => {
                // Peer-reported short write.
                drop(connection);
                Ok(acknowledged as usize)
            }
            Ok(_) => Err(eio()),
            Err(err) => Err(self.dispose(handle, connection, err)),
        }
    }

    /// Seeks the remote tape, returning the resulting offset.
    ///
    /// # Errors
    ///
    /// `EBADF` for a dead handle; `EIO` for transport failures, for an
    /// offset reply that overflows, and for a negative offset reply (neither
    /// of the latter tears the session down — the reply line itself was well
    /// formed); peer errnos verbatim.
    pub fn seek(&mut self, handle: usize, position: SeekFrom) -> io::Result<u64> {
        let mut connection = self.take(handle).ok_or_else(bad_handle)?;

        let (whence, offset) = Whence::from_seek(position);
        let request = Command::Seek { whence, offset };
        connection
            .send_command(&request.to_wire())
            .map_err(|_| eio())?;

        match status::read_offset(&mut connection) {
            Ok(offset) if offset >= 0 => {
                self.put_back(handle, connection);
                Ok(offset as u64)
            }
            Ok(_) => {
                self.put_back(handle, connection);
                Err(eio())
            }
            Err(err) => Err(self.dispose(handle, connection, err)),
        }
    }

    /// Performs a tape ioctl.
    ///
    /// Tape operations return the peer's status count. A drive-status
    /// request fills the caller's [`MtGet`] and returns zero; if the peer
    /// sends a structure of the wrong size the session is torn down. Any
    /// other request number is rejected locally.
    ///
    /// # Errors
    ///
    /// `EOPNOTSUPP` for unsupported requests, otherwise as the other
    /// operations.
    pub fn ioctl(&mut self, handle: usize, request: IoctlRequest<'_>) -> io::Result<i64> {
        match request {
            IoctlRequest::Other(_) => Err(io::Error::from_raw_os_error(libc::EOPNOTSUPP)),
            IoctlRequest::TapeOperation(op) => {
                let mut connection = self.take(handle).ok_or_else(bad_handle)?;
                let command = Command::TapeOp {
                    op: op.op,
                    count: op.count,
                };
                connection
                    .send_command(&command.to_wire())
                    .map_err(|_| eio())?;
                match status::read_count(&mut connection) {
                    Ok(result) => {
                        self.put_back(handle, connection);
                        Ok(result)
                    }
                    Err(err) => Err(self.dispose(handle, connection, err)),
                }
            }
            IoctlRequest::DriveStatus(out) => {
                let mut connection = self.take(handle).ok_or_else(bad_handle)?;
                connection
                    .send_command(&Command::GetStatus.to_wire())
                    .map_err(|_| eio())?;

                let size = match status::read_count(&mut connection) {
                    Ok(size) => size,
                    Err(err) => return Err(self.dispose(handle, connection, err)),
                };
                if size as u128 != MTGET_SIZE as u128 {
                    // A status image of the wrong size cannot be reconciled
                    // with the local structure layout.
                    return Err(eio());
                }

                let mut image = [0u8; MTGET_SIZE];
                connection.read_payload(&mut image).map_err(|_| eio())?;
                let Some(decoded) = MtGet::from_wire(&image) else {
                    drop(connection);
                    return Err(eio());
                };

                *out = decoded;
                self.put_back(handle, connection);
                Ok(0)
            }
        }
    }

    /// Routes a protocol error: fatal classes drop the connection (shutting
    /// the session down), recoverable ones reinstall it.
    fn dispose(&mut self, handle: usize, connection: Connection, err: ProtocolError) -> io::Error {
        if err.is_fatal() {
            warn!(handle, %err, "shutting down remote tape session");
            drop(connection);
        } else {
            self.put_back(handle, connection);
        }
        io::Error::from(err)
    }
}
