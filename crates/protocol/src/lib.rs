#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `rmt_protocol` implements the wire codec of the remote magnetic-tape (rmt)
//! protocol: the newline-delimited command language spoken between an archive
//! client and the `rmt` helper running on a remote host, together with the
//! `A`/`E`/`F` status replies the helper sends back.
//!
//! The crate is transport-agnostic. Commands are encoded into byte buffers and
//! replies are parsed from any [`std::io::Read`]; pipe management, process
//! spawning and session bookkeeping live in the sibling `rmt-transport` crate
//! and in the `oc-rmt` root crate.
//!
//! # Design
//!
//! - [`command`] encodes the closed set of outbound commands (`O`, `C`, `R`,
//!   `W`, `L`, `I`, `S`) bit-exactly, including the historical quirk that `S`
//!   is sent without a terminating newline.
//! - [`oflags`] renders POSIX open flags in the dual numeric + symbolic form
//!   the `O` command carries.
//! - [`status`] reads and parses status lines with the protocol's 64-byte
//!   bound and its tolerance for leading spaces.
//! - [`mtio`] holds the tape ioctl structures exchanged by the `I` and `S`
//!   commands, including the legacy cross-endianness byte-swap heuristic.
//!
//! # Invariants
//!
//! - Every encoded command is ASCII and contains no newline other than its
//!   delimiters; callers must reject file names with embedded newlines before
//!   encoding.
//! - A status line is at most [`status::STATUS_LINE_LIMIT`] bytes including
//!   its newline; longer lines mean the connection is desynchronised.
//! - Parse failures never consume more reply bytes than the malformed line
//!   itself (plus the discarded message line after `E`/`F`).
//!
//! # Errors
//!
//! All parse failures surface as [`error::ProtocolError`], which converts
//! losslessly into [`std::io::Error`] carrying the POSIX errno the historical
//! client would have reported.

pub mod command;
pub mod error;
pub mod mtio;
pub mod oflags;
pub mod status;

pub use command::{Command, Whence};
pub use error::ProtocolError;
pub use mtio::{MtGet, MtOp};
pub use oflags::OpenFlags;
pub use status::{read_count, read_offset, STATUS_LINE_LIMIT};
