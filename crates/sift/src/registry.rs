//! Shared message-handle cache
//!
//! At most one [`MessageHandle`] exists per (mailbox, message id) pair
//! within a session, so fields fetched through one query are visible
//! through every other query over the same mailbox. The registry is owned
//! by its session; its lifetime ends with the connection instead of
//! growing for the life of the process. An optional capacity bound evicts
//! handles no caller still references once exceeded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::handle::MessageHandle;
use crate::models::MessageId;

pub struct HandleRegistry {
    handles: Mutex<HashMap<(String, MessageId), Arc<MessageHandle>>>,
    capacity: Option<usize>,
}

impl HandleRegistry {
    /// An unbounded registry
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// A registry that evicts unreferenced handles once more than
    /// `capacity` entries are cached. Handles still held by a caller or a
    /// resolved query are never evicted.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Return the handle for (mailbox, id), creating it with `make` when
    /// it is not cached yet. Check-then-insert happens under one lock, so
    /// concurrent first access to the same message yields a single handle.
    pub fn get_or_create<F>(&self, mailbox: &str, id: MessageId, make: F) -> Arc<MessageHandle>
    where
        F: FnOnce() -> MessageHandle,
    {
        let mut handles = self.handles.lock().unwrap();
        let key = (mailbox.to_string(), id);
        if let Some(handle) = handles.get(&key) {
            return Arc::clone(handle);
        }

        if let Some(capacity) = self.capacity
            && handles.len() >= capacity
        {
            let before = handles.len();
            handles.retain(|_, handle| Arc::strong_count(handle) > 1);
            log::debug!("evicted {} unreferenced handles", before - handles.len());
        }

        let handle = Arc::new(make());
        handles.insert(key, Arc::clone(&handle));
        handle
    }

    /// Handle already cached for (mailbox, id), if any
    pub fn get(&self, mailbox: &str, id: MessageId) -> Option<Arc<MessageHandle>> {
        let handles = self.handles.lock().unwrap();
        handles.get(&(mailbox.to_string(), id)).map(Arc::clone)
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached handle
    pub fn clear(&self) {
        self.handles.lock().unwrap().clear();
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Priority;
    use crate::session::Connection;
    use crate::transport::testutil::NullTransport;

    fn test_conn() -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(Connection::new(Box::new(NullTransport))))
    }

    fn make_handle(conn: &Arc<Mutex<Connection>>, mailbox: &str, id: u32) -> MessageHandle {
        MessageHandle::new(
            Arc::clone(conn),
            Arc::from(mailbox),
            MessageId::new(id),
            Priority::Headers,
        )
    }

    #[test]
    fn test_get_or_create_returns_the_same_instance() {
        let registry = HandleRegistry::new();
        let conn = test_conn();

        let first =
            registry.get_or_create("INBOX", MessageId::new(1), || make_handle(&conn, "INBOX", 1));
        let second =
            registry.get_or_create("INBOX", MessageId::new(1), || make_handle(&conn, "INBOX", 1));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_id_in_different_mailboxes_is_distinct() {
        let registry = HandleRegistry::new();
        let conn = test_conn();

        let inbox =
            registry.get_or_create("INBOX", MessageId::new(1), || make_handle(&conn, "INBOX", 1));
        let archive = registry
            .get_or_create("Archive", MessageId::new(1), || {
                make_handle(&conn, "Archive", 1)
            });

        assert!(!Arc::ptr_eq(&inbox, &archive));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_capacity_evicts_only_unreferenced_handles() {
        let registry = HandleRegistry::with_capacity(Some(2));
        let conn = test_conn();

        let kept =
            registry.get_or_create("INBOX", MessageId::new(1), || make_handle(&conn, "INBOX", 1));
        registry.get_or_create("INBOX", MessageId::new(2), || make_handle(&conn, "INBOX", 2));
        registry.get_or_create("INBOX", MessageId::new(3), || make_handle(&conn, "INBOX", 3));

        // Message 2 was unreferenced at the bound, message 1 is pinned by
        // `kept` and survives.
        assert!(registry.get("INBOX", MessageId::new(2)).is_none());
        let again =
            registry.get_or_create("INBOX", MessageId::new(1), || make_handle(&conn, "INBOX", 1));
        assert!(Arc::ptr_eq(&kept, &again));
    }

    #[test]
    fn test_clear_drops_everything() {
        let registry = HandleRegistry::new();
        let conn = test_conn();

        registry.get_or_create("INBOX", MessageId::new(1), || make_handle(&conn, "INBOX", 1));
        assert!(!registry.is_empty());

        registry.clear();
        assert!(registry.is_empty());
    }
}
