//! Adapter between the session layer and a buffered-archive engine.
//!
//! Archive engines drive their media through a small callback surface —
//! open, close, read, write, seek, plus a destructor — so the same buffering
//! code serves local files and remote tapes alike. [`ArchiveIo`] is that
//! surface as a trait; [`RemoteTapeIo`] is the implementation that routes
//! `host:file` names through the remote tape client and everything else
//! through an ordinary [`File`]. Block-factored buffering itself lives in
//! the archive engine, not here.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::PoisonError;

use rmt_protocol::OpenFlags;

use crate::session::default_table;

/// Additive offset applied to remote handles.
///
/// Remote handles returned by open are biased into a range no real file
/// descriptor reaches, so archive code holding a bare integer can tell the
/// two apart.
pub const REMOTE_HANDLE_BIAS: i32 = 128;

/// Size in bytes of one archive block; records are multiples of this.
pub const BLOCK_SIZE: usize = 512;

/// The callback surface a buffered-archive engine drives media through.
///
/// The sixth historical callback, the destructor, is [`Drop`].
pub trait ArchiveIo {
    /// Opens the underlying medium.
    fn open(&mut self) -> io::Result<()>;
    /// Closes the underlying medium.
    fn close(&mut self) -> io::Result<()>;
    /// Reads up to `buffer.len()` bytes; zero means end of medium.
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
    /// Writes `buffer`, returning how much the medium accepted.
    fn write(&mut self, buffer: &[u8]) -> io::Result<usize>;
    /// Repositions the medium.
    fn seek(&mut self, position: SeekFrom) -> io::Result<u64>;
}

enum Medium {
    Closed,
    Local(File),
    /// Unbiased handle into the process-wide session table.
    Remote(usize),
}

/// Archive I/O over a file name that may address a remote tape.
///
/// State mirrors what the historical adapter kept per archive: the file
/// name, the (biased, here stored unbiased) handle, the remote-shell and
/// remote-command paths, and the blocking factor.
pub struct RemoteTapeIo {
    file_name: String,
    flags: OpenFlags,
    remote_shell: Option<PathBuf>,
    rmt_command: Option<String>,
    blocking_factor: usize,
    force_local: bool,
    medium: Medium,
}

impl RemoteTapeIo {
    /// Creates an adapter for `file_name`, opened with `flags`.
    #[must_use]
    pub fn new(file_name: impl Into<String>, flags: OpenFlags) -> Self {
        Self {
            file_name: file_name.into(),
            flags,
            remote_shell: None,
            rmt_command: None,
            blocking_factor: 20,
            force_local: false,
            medium: Medium::Closed,
        }
    }

    /// Sets the transport binary used for remote names.
    pub fn set_remote_shell(&mut self, shell: impl Into<PathBuf>) -> &mut Self {
        self.remote_shell = Some(shell.into());
        self
    }

    /// Sets the helper executed on the remote host.
    pub fn set_rmt_command(&mut self, command: impl Into<String>) -> &mut Self {
        self.rmt_command = Some(command.into());
        self
    }

    /// Sets the blocking factor (record size in 512-byte blocks).
    pub fn set_blocking_factor(&mut self, factor: usize) -> &mut Self {
        self.blocking_factor = factor;
        self
    }

    /// Treats every file name as local, colons included.
    ///
    /// When set, the remote machinery is bypassed entirely: the name is
    /// never parsed for `host:file` syntax and no remote shell is spawned.
    pub fn set_force_local(&mut self, force_local: bool) -> &mut Self {
        self.force_local = force_local;
        self
    }

    /// The record size implied by the blocking factor.
    #[must_use]
    pub fn record_size(&self) -> usize {
        self.blocking_factor * BLOCK_SIZE
    }

    /// Whether this archive will use the remote path when opened.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        !self.force_local && rmt_transport::is_remote_path(&self.file_name)
    }

    fn local_open(&self) -> io::Result<File> {
        let bits = self.flags.bits();
        OpenOptions::new()
            .read(bits & libc::O_ACCMODE != libc::O_WRONLY)
            .write(self.flags.is_writable())
            .create(bits & libc::O_CREAT != 0)
            .truncate(bits & libc::O_TRUNC != 0)
            .append(bits & libc::O_APPEND != 0)
            .open(&self.file_name)
    }
}

impl ArchiveIo for RemoteTapeIo {
    fn open(&mut self) -> io::Result<()> {
        if !matches!(self.medium, Medium::Closed) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "archive is already open",
            ));
        }

        self.medium = if self.is_remote() {
            let mut table = default_table()
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let biased = table.open(
                &self.file_name,
                self.flags,
                REMOTE_HANDLE_BIAS,
                self.remote_shell.as_deref(),
                self.rmt_command.as_deref(),
            )?;
            Medium::Remote((biased - REMOTE_HANDLE_BIAS) as usize)
        } else {
            Medium::Local(self.local_open()?)
        };
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.medium, Medium::Closed) {
            Medium::Closed => Ok(()),
            Medium::Local(_file) => Ok(()),
            Medium::Remote(handle) => {
                let mut table = default_table()
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                table.close(handle).map(|_| ())
            }
        }
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        match &mut self.medium {
            Medium::Closed => Err(io::Error::from_raw_os_error(libc::EBADF)),
            Medium::Local(file) => file.read(buffer),
            Medium::Remote(handle) => default_table()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .read(*handle, buffer),
        }
    }

    fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
        match &mut self.medium {
            Medium::Closed => Err(io::Error::from_raw_os_error(libc::EBADF)),
            Medium::Local(file) => file.write(buffer),
            Medium::Remote(handle) => default_table()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write(*handle, buffer),
        }
    }

    fn seek(&mut self, position: SeekFrom) -> io::Result<u64> {
        match &mut self.medium {
            Medium::Closed => Err(io::Error::from_raw_os_error(libc::EBADF)),
            Medium::Local(file) => file.seek(position),
            Medium::Remote(handle) => default_table()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .seek(*handle, position),
        }
    }
}

impl Drop for RemoteTapeIo {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_stay_local() {
        let io = RemoteTapeIo::new("/dev/nst0", OpenFlags::new(libc::O_RDONLY));
        assert!(!io.is_remote());
    }

    #[test]
    fn colon_names_are_remote_unless_forced_local() {
        let mut io = RemoteTapeIo::new("vault:/dev/nst0", OpenFlags::new(libc::O_RDONLY));
        assert!(io.is_remote());
        io.set_force_local(true);
        assert!(!io.is_remote());
    }

    #[test]
    fn record_size_follows_blocking_factor() {
        let mut io = RemoteTapeIo::new("archive.tar", OpenFlags::new(libc::O_RDONLY));
        assert_eq!(io.record_size(), 20 * BLOCK_SIZE);
        io.set_blocking_factor(64);
        assert_eq!(io.record_size(), 64 * BLOCK_SIZE);
    }

    #[test]
    fn local_round_trip_through_the_adapter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("archive.tar");

        let mut writer = RemoteTapeIo::new(
            path.to_str().expect("utf-8 temp path"),
            OpenFlags::new(libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC),
        );
        writer.open().expect("create archive");
        assert_eq!(writer.write(b"ustar-block").unwrap(), 11);
        writer.close().expect("close archive");

        let mut reader = RemoteTapeIo::new(
            path.to_str().expect("utf-8 temp path"),
            OpenFlags::new(libc::O_RDONLY),
        );
        reader.open().expect("open archive");
        let mut buf = [0u8; 32];
        let n = reader.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ustar-block");
    }

    #[test]
    fn force_local_opens_colon_names_as_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("odd:name.tar");
        std::fs::File::create(&path)
            .expect("create")
            .write_all(b"data")
            .expect("write");

        let mut io = RemoteTapeIo::new(
            path.to_str().expect("utf-8 temp path"),
            OpenFlags::new(libc::O_RDONLY),
        );
        io.set_force_local(true);
        io.open().expect("forced-local open");
        let mut buf = [0u8; 8];
        assert_eq!(io.read(&mut buf).unwrap(), 4);
    }

    #[test]
    fn operations_on_a_closed_archive_fail_cleanly() {
        let mut io = RemoteTapeIo::new("archive.tar", OpenFlags::new(libc::O_RDONLY));
        let mut buf = [0u8; 4];
        assert_eq!(
            io.read(&mut buf).unwrap_err().raw_os_error(),
            Some(libc::EBADF)
        );
        assert_eq!(io.write(b"x").unwrap_err().raw_os_error(), Some(libc::EBADF));
        assert!(io.close().is_ok());
    }

    #[test]
    fn double_open_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a");
        std::fs::write(&path, b"").expect("create");

        let mut io = RemoteTapeIo::new(
            path.to_str().expect("utf-8 temp path"),
            OpenFlags::new(libc::O_RDONLY),
        );
        io.open().expect("first open");
        assert_eq!(
            io.open().unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }
}
