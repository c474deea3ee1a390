//! Tape ioctl structures exchanged by the `I` and `S` commands.
//!
//! The `I` command carries a tape operation and repeat count as text; nothing
//! binary crosses the wire. The `S` command is answered with the remote
//! drive-status structure as a raw byte image, historically assumed to be
//! contiguous and unpadded. Because the image is produced on the remote host,
//! a legacy heuristic compensates for a peer of the opposite byte order: if
//! the drive-type field decodes to a value above 255, every adjacent byte
//! pair of the whole structure is swapped.

#![allow(unsafe_code)]

use core::fmt;
use core::mem;
use core::ptr;

/// Rewind the tape (`MTRESET` on some systems re-initialises the drive).
pub const MTRESET: i16 = 0;
/// Forward space over `count` filemarks.
pub const MTFSF: i16 = 1;
/// Backward space over `count` filemarks.
pub const MTBSF: i16 = 2;
/// Forward space over `count` records.
pub const MTFSR: i16 = 3;
/// Backward space over `count` records.
pub const MTBSR: i16 = 4;
/// Write `count` end-of-file marks.
pub const MTWEOF: i16 = 5;
/// Rewind the tape.
pub const MTREW: i16 = 6;
/// Rewind and take the drive offline.
pub const MTOFFL: i16 = 7;
/// No operation; useful to flush the drive's buffers.
pub const MTNOP: i16 = 8;
/// Retension the tape.
pub const MTRETEN: i16 = 9;
/// Backward space to before `count` filemarks.
pub const MTBSFM: i16 = 10;
/// Forward space to after `count` filemarks.
pub const MTFSFM: i16 = 11;
/// Space to end of recorded media.
pub const MTEOM: i16 = 12;
/// Erase the tape.
pub const MTERASE: i16 = 13;
/// Set the drive's block size.
pub const MTSETBLK: i16 = 20;
/// Seek to block number `count`.
pub const MTSEEK: i16 = 22;
/// Report the current block number.
pub const MTTELL: i16 = 23;

/// Argument of the `I` (tape operation) command, mirroring `struct mtop`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct MtOp {
    /// Operation code (`MTWEOF`, `MTFSF`, …).
    pub op: i16,
    /// Repeat count for the operation.
    pub count: i32,
}

impl MtOp {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(op: i16, count: i32) -> Self {
        Self { op, count }
    }
}

impl fmt::Display for MtOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tape op {} x{}", self.op, self.count)
    }
}

/// Drive status structure returned by the `S` command, mirroring the layout
/// of `struct mtget` on the local platform.
///
/// The remote helper transmits its own `struct mtget` as a raw byte image;
/// interoperability therefore assumes both ends agree on the layout, exactly
/// as the historical clients did. [`MtGet::from_wire`] performs the
/// cross-endianness fixup described at the module level.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MtGet {
    /// Drive type. Doubles as the byte-order canary: real drive types are
    /// small integers, so a value above 255 betrays a byte-swapped image.
    pub mt_type: libc::c_long,
    /// Residual count of the last operation.
    pub mt_resid: libc::c_long,
    /// Drive-status register (device dependent).
    pub mt_dsreg: libc::c_long,
    /// Generic status bits.
    pub mt_gstat: libc::c_long,
    /// Error register (device dependent).
    pub mt_erreg: libc::c_long,
    /// Current file number.
    pub mt_fileno: i32,
    /// Current block number.
    pub mt_blkno: i32,
}

/// Byte size of the status image on the wire.
pub const MTGET_SIZE: usize = mem::size_of::<MtGet>();

// The pair-swap heuristic only works on an even-sized image.
const _: () = assert!(MTGET_SIZE % 2 == 0);

impl MtGet {
    /// Decodes a raw status image received from the remote helper.
    ///
    /// Returns `None` when `image` is not exactly [`MTGET_SIZE`] bytes.
    /// If the decoded drive-type field exceeds 255, every adjacent byte pair
    /// is swapped before decoding; this must be preserved bit-exactly to
    /// interoperate with historical remote helpers on opposite-endian hosts.
    #[must_use]
    pub fn from_wire(image: &[u8]) -> Option<Self> {
        if image.len() != MTGET_SIZE {
            return None;
        }

        let mut bytes = [0u8; MTGET_SIZE];
        bytes.copy_from_slice(image);

        if !(Self::decode_check_field(&bytes) < 256) {
            swap_adjacent_pairs(&mut bytes);
        }

        // SAFETY: `MtGet` is a `repr(C)` struct of integer fields and `bytes`
        // holds exactly `size_of::<MtGet>()` initialised bytes; reading it
        // unaligned from the local buffer is sound for any bit pattern.
        Some(unsafe { ptr::read_unaligned(bytes.as_ptr().cast::<Self>()) })
    }

    /// Encodes this structure as the raw byte image the wire carries.
    ///
    /// Used by mock remote helpers in tests and by embedders that proxy the
    /// status structure onwards.
    #[must_use]
    pub fn to_wire(&self) -> [u8; MTGET_SIZE] {
        let mut bytes = [0u8; MTGET_SIZE];
        // SAFETY: `self` is a plain `repr(C)` integer struct; viewing its
        // `size_of` bytes is sound and cannot observe uninitialised padding
        // because the layout contains none on LP64 and ILP32 targets.
        let image = unsafe {
            core::slice::from_raw_parts(ptr::from_ref(self).cast::<u8>(), MTGET_SIZE)
        };
        bytes.copy_from_slice(image);
        bytes
    }

    fn decode_check_field(bytes: &[u8; MTGET_SIZE]) -> libc::c_long {
        let mut field = [0u8; mem::size_of::<libc::c_long>()];
        field.copy_from_slice(&bytes[..mem::size_of::<libc::c_long>()]);
        libc::c_long::from_ne_bytes(field)
    }
}

fn swap_adjacent_pairs(bytes: &mut [u8; MTGET_SIZE]) {
    for pair in bytes.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}
