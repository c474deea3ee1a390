//! Classic process-wide entry points.
//!
//! Historical archive programs call `rmt_open`, `rmt_read` and friends
//! against a single program-global connection table and pass the small
//! integer handles across module boundaries. These functions preserve that
//! shape over [`default_table`](crate::session::default_table); new code
//! that can thread a context object through should prefer the methods on
//! [`SessionTable`](crate::session::SessionTable) instead.
//!
//! Callers must serialise operations per handle themselves; the mutex here
//! only protects the table, it does not make interleaved commands on one
//! session meaningful.

use std::io::{self, SeekFrom};
use std::path::Path;
use std::sync::{MutexGuard, PoisonError};

use rmt_protocol::OpenFlags;

use crate::client::IoctlRequest;
use crate::session::{default_table, SessionTable};

fn table() -> MutexGuard<'static, SessionTable> {
    default_table().lock().unwrap_or_else(PoisonError::into_inner)
}

/// Opens a remote tape through the process-wide table.
///
/// See [`SessionTable::open`].
///
/// # Errors
///
/// As [`SessionTable::open`].
pub fn open(
    file_name: &str,
    flags: OpenFlags,
    bias: i32,
    remote_shell: Option<&Path>,
    rmt_command: Option<&str>,
) -> io::Result<i32> {
    table().open(file_name, flags, bias, remote_shell, rmt_command)
}

/// Closes a session in the process-wide table.
///
/// # Errors
///
/// As [`SessionTable::close`].
pub fn close(handle: usize) -> io::Result<i64> {
    table().close(handle)
}

/// Reads from a session in the process-wide table.
///
/// # Errors
///
/// As [`SessionTable::read`].
pub fn read(handle: usize, buffer: &mut [u8]) -> io::Result<usize> {
    table().read(handle, buffer)
}

/// Writes to a session in the process-wide table.
///
/// # Errors
///
/// As [`SessionTable::write`].
pub fn write(handle: usize, buffer: &[u8]) -> io::Result<usize> {
    table().write(handle, buffer)
}

/// Seeks a session in the process-wide table.
///
/// # Errors
///
/// As [`SessionTable::seek`].
pub fn seek(handle: usize, position: SeekFrom) -> io::Result<u64> {
    table().seek(handle, position)
}

/// Performs a tape ioctl on a session in the process-wide table.
///
/// # Errors
///
/// As [`SessionTable::ioctl`].
pub fn ioctl(handle: usize, request: IoctlRequest<'_>) -> io::Result<i64> {
    table().ioctl(handle, request)
}
