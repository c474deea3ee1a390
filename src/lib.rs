#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

/// Buffered-archive adapter and the force-local escape hatch.
pub mod archive;
/// The operation layer: open, close, read, write, seek, ioctl.
pub mod client;
/// Classic free-function entry points over the process-wide table.
pub mod rmt;
/// The fixed-capacity session table.
pub mod session;

pub use archive::{ArchiveIo, RemoteTapeIo, BLOCK_SIZE, REMOTE_HANDLE_BIAS};
pub use client::IoctlRequest;
pub use session::{default_table, SessionTable, MAXUNIT};

/// Wire codec for the rmt protocol.
pub use rmt_protocol as protocol;
/// Remote-shell transport and connection management.
pub use rmt_transport as transport;

pub use rmt_protocol::{MtGet, MtOp, OpenFlags};
pub use rmt_transport::{Connection, RemoteEndpoint, DEFAULT_RMT_COMMAND};
