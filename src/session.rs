//! The session table.
//!
//! Callers address remote tape sessions through small non-negative integers,
//! the way archive programs have always passed tape "file descriptors"
//! around. The table maps those handles onto live connections. Capacity is a
//! compile-time constant; allocation scans for the first free slot in
//! ascending order so handle reuse is deterministic.

use std::sync::Mutex;

use rmt_transport::Connection;

/// Maximum number of simultaneous remote tape sessions.
pub const MAXUNIT: usize = 4;

/// Fixed-capacity registry of active remote-tape sessions.
///
/// A slot either holds a full [`Connection`] (both endpoints open) or
/// nothing; there is no half-open state to corrupt. The operation layer in
/// [`crate::client`] is implemented as methods on this type, making the
/// table the context object for a group of sessions. Programs that want the
/// classic process-wide behaviour use [`default_table`] through the
/// [`crate::rmt`] functions.
pub struct SessionTable {
    slots: [Option<Connection>; MAXUNIT],
}

impl SessionTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; MAXUNIT],
        }
    }

    /// First free handle in ascending order, if any.
    #[must_use]
    pub fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Installs an established connection into a free slot.
    ///
    /// Used by the open path and by alternate transports (or tests) that
    /// establish their connection out of band.
    ///
    /// # Panics
    ///
    /// Panics when `handle` is out of range or the slot is occupied; both
    /// indicate a caller bug, not a runtime condition.
    pub fn install(&mut self, handle: usize, connection: Connection) {
        assert!(handle < MAXUNIT, "tape handle {handle} out of range");
        let slot = &mut self.slots[handle];
        assert!(slot.is_none(), "tape handle {handle} already in use");
        *slot = Some(connection);
    }

    /// Shuts a session down, closing both endpoints.
    ///
    /// Dropping the connection closes the pipe pair; the remote child sees
    /// EOF and exits. Releasing a handle that is already free (or out of
    /// range) is a no-op.
    pub fn release(&mut self, handle: usize) {
        if let Some(slot) = self.slots.get_mut(handle) {
            *slot = None;
        }
    }

    /// Whether `handle` currently addresses a live session.
    #[must_use]
    pub fn is_active(&self, handle: usize) -> bool {
        matches!(self.slots.get(handle), Some(Some(_)))
    }

    /// Number of live sessions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Removes and returns the connection behind `handle` for the duration
    /// of an operation. The caller either puts it back on success or lets it
    /// drop, which is the shutdown.
    pub(crate) fn take(&mut self, handle: usize) -> Option<Connection> {
        self.slots.get_mut(handle).and_then(Option::take)
    }

    pub(crate) fn put_back(&mut self, handle: usize, connection: Connection) {
        self.slots[handle] = Some(connection);
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide default table.
///
/// Historical archive programs treat the connection table as program-global
/// state and pass bare integers across module boundaries; the [`crate::rmt`]
/// functions preserve that shape on top of this instance.
#[must_use]
pub fn default_table() -> &'static Mutex<SessionTable> {
    static TABLE: Mutex<SessionTable> = Mutex::new(SessionTable::new());
    &TABLE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn mock_connection() -> Connection {
        Connection::from_parts(Box::new(Cursor::new(Vec::new())), Box::new(Vec::new()))
    }

    #[test]
    fn allocation_is_ascending_and_deterministic() {
        let mut table = SessionTable::new();
        assert_eq!(table.free_slot(), Some(0));
        table.install(0, mock_connection());
        assert_eq!(table.free_slot(), Some(1));
        table.install(1, mock_connection());

        table.release(0);
        // The lowest slot is reused first.
        assert_eq!(table.free_slot(), Some(0));
    }

    #[test]
    fn table_is_bounded_by_maxunit() {
        let mut table = SessionTable::new();
        for handle in 0..MAXUNIT {
            assert_eq!(table.free_slot(), Some(handle));
            table.install(handle, mock_connection());
        }
        assert_eq!(table.free_slot(), None);
        assert_eq!(table.active_count(), MAXUNIT);
    }

    #[test]
    fn release_is_tolerant_of_double_and_wild_calls() {
        let mut table = SessionTable::new();
        table.install(2, mock_connection());
        table.release(2);
        table.release(2);
        table.release(MAXUNIT + 10);
        assert_eq!(table.active_count(), 0);
    }

    #[test]
    fn endpoints_are_all_or_nothing() {
        let mut table = SessionTable::new();
        assert!(!table.is_active(1));
        table.install(1, mock_connection());
        assert!(table.is_active(1));
        table.release(1);
        assert!(!table.is_active(1));
        assert!(!table.is_active(MAXUNIT + 1));
    }

    #[test]
    #[should_panic(expected = "already in use")]
    fn double_install_is_a_caller_bug() {
        let mut table = SessionTable::new();
        table.install(0, mock_connection());
        table.install(0, mock_connection());
    }
}
