//! Dual numeric/symbolic rendering of POSIX open flags.
//!
//! The `O` command transmits the open flags twice: once as the raw decimal
//! value (authoritative) and once as the canonical `O_RDONLY|O_CREAT|…` text
//! form (informational, so a helper built with different flag values can still
//! reconstruct the caller's intent). The symbolic form always names exactly
//! one access mode, followed by the optional flags that are set, joined with
//! `|` in a fixed historical order.

use core::fmt;

/// Optional flags in the order the historical encoder emits them.
///
/// On platforms where a flag is aliased (glibc's `O_RSYNC` equals `O_SYNC`)
/// or where `O_SYNC` subsumes the `O_DSYNC` bits, several names can match one
/// set bit; all matching names are emitted, which is what the historical
/// encoder does too.
const OPTIONAL_FLAGS: &[(libc::c_int, &str)] = &[
    (libc::O_APPEND, "O_APPEND"),
    (libc::O_CREAT, "O_CREAT"),
    (libc::O_DSYNC, "O_DSYNC"),
    (libc::O_EXCL, "O_EXCL"),
    (libc::O_LARGEFILE, "O_LARGEFILE"),
    (libc::O_NOCTTY, "O_NOCTTY"),
    (libc::O_NONBLOCK, "O_NONBLOCK"),
    (libc::O_RSYNC, "O_RSYNC"),
    (libc::O_SYNC, "O_SYNC"),
    (libc::O_TRUNC, "O_TRUNC"),
];

/// POSIX open flags destined for the remote `open` call.
///
/// A thin wrapper over the raw `c_int` accepted by `open(2)`. The wrapper
/// exists so the codec can render the dual numeric/symbolic wire form and so
/// call sites cannot confuse open flags with the equally-integer whence and
/// handle values floating around the client.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct OpenFlags(libc::c_int);

impl OpenFlags {
    /// Wraps a raw `open(2)` flag value.
    #[must_use]
    pub const fn new(bits: libc::c_int) -> Self {
        Self(bits)
    }

    /// Returns the raw flag value.
    #[must_use]
    pub const fn bits(self) -> libc::c_int {
        self.0
    }

    /// Whether the access mode requests write access.
    #[must_use]
    pub fn is_writable(self) -> bool {
        matches!(self.0 & libc::O_ACCMODE, libc::O_WRONLY | libc::O_RDWR)
    }

    /// Renders the canonical symbolic form, e.g. `O_WRONLY|O_CREAT|O_TRUNC`.
    ///
    /// # Panics
    ///
    /// Panics if the access-mode bits are not one of `O_RDONLY`, `O_WRONLY`
    /// or `O_RDWR`; such a value could never have been passed to a successful
    /// `open(2)` and the historical encoder aborts on it as well.
    #[must_use]
    pub fn symbolic(self) -> String {
        let mut out = String::from(match self.0 & libc::O_ACCMODE {
            libc::O_RDONLY => "O_RDONLY",
            libc::O_RDWR => "O_RDWR",
            libc::O_WRONLY => "O_WRONLY",
            _ => panic!("invalid open(2) access mode in {:#o}", self.0),
        });

        for &(bit, name) in OPTIONAL_FLAGS {
            // Flags that are 0 on this platform (glibc's O_LARGEFILE with
            // 64-bit off_t) can never test as present.
            if bit != 0 && self.0 & bit == bit {
                out.push('|');
                out.push_str(name);
            }
        }

        out
    }
}

impl fmt::Display for OpenFlags {
    /// Formats the wire form of the `O` command's second line: the decimal
    /// value, a space, then the symbolic form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.symbolic())
    }
}

impl From<libc::c_int> for OpenFlags {
    fn from(bits: libc::c_int) -> Self {
        Self::new(bits)
    }
}
