//! Error types produced while parsing rmt status replies.

use core::fmt;
use std::io;

/// Errors produced while parsing rmt status replies.
///
/// Apart from [`PeerError`](Self::PeerError), every variant indicates that the
/// reply stream can no longer be trusted and the session must be torn down.
/// The [`is_fatal`](Self::is_fatal) predicate encodes which variants mandate
/// teardown; [`errno`](Self::errno) yields the POSIX errno the historical
/// client reported for the failure.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProtocolError {
    /// The status line filled the 64-byte buffer without a newline.
    LineTooLong,
    /// The reply stream ended before a complete status line arrived.
    TruncatedReply,
    /// The first non-space byte of the status line was not `A`, `E` or `F`.
    Desynchronized {
        /// The unexpected byte.
        byte: u8,
    },
    /// An `A` reply carried a negative count.
    NegativeCount,
    /// An `A` reply carried an offset that does not fit the offset type.
    OffsetOverflow,
    /// An `A` reply carried no parseable offset at all.
    MalformedOffset,
    /// The peer reported a failure via an `E` (recoverable) or `F` (fatal)
    /// reply. The errno has already been normalised: values the peer reported
    /// as zero or negative become `EIO`.
    PeerError {
        /// Decoded errno value, always positive.
        errno: i32,
        /// `true` for `F` replies, which mandate connection teardown.
        fatal: bool,
    },
}

impl ProtocolError {
    /// Whether this failure requires tearing the session down.
    ///
    /// `E` replies leave the session usable; an offset overflow leaves the
    /// reply stream positioned after a complete, well-framed line. Everything
    /// else means the pipes are desynchronised.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::PeerError { fatal, .. } => *fatal,
            Self::OffsetOverflow | Self::MalformedOffset => false,
            Self::LineTooLong
            | Self::TruncatedReply
            | Self::Desynchronized { .. }
            | Self::NegativeCount => true,
        }
    }

    /// The POSIX errno value this failure surfaces as.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::PeerError { errno, .. } => *errno,
            _ => libc::EIO,
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineTooLong => {
                write!(f, "rmt status line exceeds {} bytes", crate::STATUS_LINE_LIMIT)
            }
            Self::TruncatedReply => f.write_str("rmt reply stream ended mid-status"),
            Self::Desynchronized { byte } => {
                write!(f, "rmt connection desynchronised: unexpected status byte {byte:#04x}")
            }
            Self::NegativeCount => f.write_str("rmt success reply carried a negative count"),
            Self::OffsetOverflow => f.write_str("rmt offset reply overflows the offset type"),
            Self::MalformedOffset => f.write_str("rmt offset reply carried no decimal offset"),
            Self::PeerError { errno, fatal: true } => {
                write!(f, "remote rmt helper reported fatal error (errno {errno})")
            }
            Self::PeerError { errno, fatal: false } => {
                write!(f, "remote rmt helper reported error (errno {errno})")
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<ProtocolError> for io::Error {
    fn from(err: ProtocolError) -> Self {
        io::Error::from_raw_os_error(err.errno())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_errors_carry_their_errno() {
        let err = ProtocolError::PeerError {
            errno: libc::EACCES,
            fatal: false,
        };
        assert_eq!(err.errno(), libc::EACCES);
        assert!(!err.is_fatal());

        let io_err: io::Error = err.into();
        assert_eq!(io_err.raw_os_error(), Some(libc::EACCES));
    }

    #[test]
    fn fatal_replies_mandate_teardown() {
        let err = ProtocolError::PeerError {
            errno: libc::EIO,
            fatal: true,
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn framing_violations_are_fatal_and_map_to_eio() {
        for err in [
            ProtocolError::LineTooLong,
            ProtocolError::TruncatedReply,
            ProtocolError::Desynchronized { byte: b'Q' },
            ProtocolError::NegativeCount,
        ] {
            assert!(err.is_fatal(), "{err} should be fatal");
            assert_eq!(err.errno(), libc::EIO);
        }
    }

    #[test]
    fn offset_overflow_is_an_error_without_teardown() {
        assert!(!ProtocolError::OffsetOverflow.is_fatal());
        assert_eq!(ProtocolError::OffsetOverflow.errno(), libc::EIO);
    }

    #[test]
    fn display_names_the_unexpected_byte() {
        let rendered = ProtocolError::Desynchronized { byte: b'Q' }.to_string();
        assert!(rendered.contains("0x51"), "got: {rendered}");
    }
}
