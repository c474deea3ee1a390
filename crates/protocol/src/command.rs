//! Outbound command encoding.
//!
//! Every request the client sends is a single uppercase letter followed by
//! operation-specific arguments and newline delimiters. The set is closed;
//! the remote helper dispatches on the first byte. Binary payloads (the body
//! of a `W` command) are not part of the encoding — they follow the command
//! line raw on the wire, framed only by the advertised length.

use std::io::SeekFrom;

use crate::oflags::OpenFlags;

/// Whence selector of the `L` (seek) command.
///
/// The protocol fixes the numeric mapping independently of any platform's
/// `SEEK_*` values.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Whence {
    /// Absolute offset (`SEEK_SET`).
    Set = 0,
    /// Relative to the current position (`SEEK_CUR`).
    Cur = 1,
    /// Relative to end of medium (`SEEK_END`).
    End = 2,
}

impl Whence {
    /// Splits a [`SeekFrom`] into the protocol whence code and offset.
    #[must_use]
    pub fn from_seek(pos: SeekFrom) -> (Self, i64) {
        match pos {
            // Offsets beyond i64::MAX cannot be expressed by the protocol's
            // signed offset line; saturate rather than wrap.
            SeekFrom::Start(offset) => (Self::Set, i64::try_from(offset).unwrap_or(i64::MAX)),
            SeekFrom::Current(offset) => (Self::Cur, offset),
            SeekFrom::End(offset) => (Self::End, offset),
        }
    }
}

/// One outbound rmt command.
///
/// [`encode`](Self::encode) appends the exact wire bytes. `Write`'s payload
/// and `Read`'s response payload travel outside the command encoding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    /// `O<file>\n<flags-int> <flags-symbolic>\n` — open the remote device.
    Open {
        /// Remote file (usually a tape device path). Must not contain `\n`.
        file: &'a str,
        /// Open flags forwarded to the remote `open(2)`.
        flags: OpenFlags,
    },
    /// `C\n` — close the remote device.
    Close,
    /// `R<count>\n` — read up to `count` bytes from the device.
    Read {
        /// Requested byte count.
        count: u64,
    },
    /// `W<count>\n` — announce a write of exactly `count` payload bytes.
    Write {
        /// Payload length that will follow the command line.
        count: u64,
    },
    /// `L<whence>\n<offset>\n` — seek the remote device.
    Seek {
        /// Whence selector.
        whence: Whence,
        /// Signed byte offset.
        offset: i64,
    },
    /// `I<op>\n<count>\n` — perform a tape operation (`MTIOCTOP`).
    TapeOp {
        /// Tape operation code (see [`crate::mtio`]).
        op: i16,
        /// Operation repeat count.
        count: i32,
    },
    /// `S` — request the drive status structure (`MTIOCGET`).
    ///
    /// Deliberately sent without a terminating newline; the historical
    /// protocol never gained one for this command and remote helpers do not
    /// expect it.
    GetStatus,
}

impl Command<'_> {
    /// Appends the wire encoding of this command to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Open { file, flags } => {
                debug_assert!(!file.contains('\n'), "file names are validated upstream");
                out.push(b'O');
                out.extend_from_slice(file.as_bytes());
                out.push(b'\n');
                out.extend_from_slice(flags.to_string().as_bytes());
                out.push(b'\n');
            }
            Self::Close => out.extend_from_slice(b"C\n"),
            Self::Read { count } => {
                out.push(b'R');
                out.extend_from_slice(count.to_string().as_bytes());
                out.push(b'\n');
            }
            Self::Write { count } => {
                out.push(b'W');
                out.extend_from_slice(count.to_string().as_bytes());
                out.push(b'\n');
            }
            Self::Seek { whence, offset } => {
                out.push(b'L');
                out.extend_from_slice((*whence as u8).to_string().as_bytes());
                out.push(b'\n');
                out.extend_from_slice(offset.to_string().as_bytes());
                out.push(b'\n');
            }
            Self::TapeOp { op, count } => {
                out.push(b'I');
                out.extend_from_slice(op.to_string().as_bytes());
                out.push(b'\n');
                out.extend_from_slice(count.to_string().as_bytes());
                out.push(b'\n');
            }
            Self::GetStatus => out.push(b'S'),
        }
    }

    /// Returns the wire encoding as a fresh buffer.
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32);
        self.encode(&mut out);
        out
    }
}
