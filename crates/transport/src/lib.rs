#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `rmt_transport` establishes and manages the byte channel between the local
//! archive program and the `rmt` helper on a remote host. It owns everything
//! process- and pipe-shaped: parsing the `[user@]host:file` endpoint form,
//! spawning the remote-shell child with its stdio redirected onto a pipe
//! pair, dropping elevated privileges in the child, transmitting command
//! lines with the broken-pipe signal masked, and receiving byte-exact binary
//! payloads.
//!
//! # Design
//!
//! - [`endpoint`] parses remote endpoint strings into their user/host/file
//!   parts in a single left-to-right pass.
//! - [`shell`] is a builder for the remote-shell invocation, mirroring the
//!   argv the historical clients composed: `[basename, host, ("-l", user)?,
//!   rmt-command]`.
//! - [`connection`] owns one live session: the child handle plus both pipe
//!   halves, with SIGPIPE-scoped writes and short-read-looped payload reads.
//! - [`sigpipe`] provides the RAII guard that scopes the SIGPIPE disposition
//!   to a single write and restores it on every exit path.
//! - [`creds`] resets effective ids to the real user between fork and exec.
//! - `rexec` (behind the cargo feature of the same name) is the alternate
//!   BSD remote-execution transport over a single bidirectional socket.
//!
//! # Invariants
//!
//! - A [`connection::Connection`] always owns both directions of the channel;
//!   there is no half-open state. Dropping it closes both pipes, which the
//!   remote child observes as EOF on stdin and exits.
//! - The SIGPIPE disposition is mutated only for the duration of a write and
//!   restored on every exit path, including unwinding.
//! - The transport never retries and never times out; a slow peer blocks the
//!   calling thread.
//!
//! # Errors
//!
//! Transport-level failures surface as [`std::io::Error`] values carrying the
//! underlying errno. Endpoint parse failures have their own typed error with
//! the "no such file or directory" conversion the callers rely on.

pub mod connection;
pub mod creds;
pub mod endpoint;
#[cfg(feature = "rexec")]
pub mod rexec;
pub mod shell;
pub mod sigpipe;

pub use connection::Connection;
pub use endpoint::{is_remote_path, EndpointError, RemoteEndpoint};
pub use shell::{RemoteShellCommand, DEFAULT_RMT_COMMAND, EXIT_ON_EXEC_ERROR};
pub use sigpipe::SigPipeGuard;
