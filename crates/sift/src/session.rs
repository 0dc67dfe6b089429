//! Authenticated IMAP sessions

use std::sync::{Arc, Mutex};

use crate::config::{AccountConfig, Priority};
use crate::error::{Error, Result};
use crate::models::MessageId;
use crate::query::Query;
use crate::registry::HandleRegistry;
use crate::transport::{FetchSpec, FetchedMessage, MailboxInfo, TlsTransport, Transport};

/// The transport plus the mailbox currently selected on it.
///
/// IMAP scopes SEARCH and FETCH to the selected mailbox, so every command
/// issued through here re-selects when the target mailbox changed since
/// the last command. Queries over different mailboxes can therefore
/// interleave freely on one connection.
pub(crate) struct Connection {
    transport: Box<dyn Transport>,
    selected: Option<String>,
}

impl Connection {
    pub(crate) fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            selected: None,
        }
    }

    pub(crate) fn list_mailboxes(&mut self) -> Result<Vec<MailboxInfo>> {
        self.transport.list_mailboxes()
    }

    fn ensure_selected(&mut self, mailbox: &str) -> Result<()> {
        if self.selected.as_deref() != Some(mailbox) {
            self.transport.select(mailbox)?;
            self.selected = Some(mailbox.to_string());
        }
        Ok(())
    }

    pub(crate) fn search(&mut self, mailbox: &str, query: &str) -> Result<Vec<MessageId>> {
        self.ensure_selected(mailbox)?;
        self.transport.search(query)
    }

    pub(crate) fn fetch(
        &mut self,
        mailbox: &str,
        ids: &[MessageId],
        spec: FetchSpec,
    ) -> Result<Vec<FetchedMessage>> {
        self.ensure_selected(mailbox)?;
        self.transport.fetch(ids, spec)
    }

    /// Single-message fetch; the response must cover exactly that message.
    pub(crate) fn fetch_one(
        &mut self,
        mailbox: &str,
        id: MessageId,
        spec: FetchSpec,
    ) -> Result<Vec<u8>> {
        let mut fetched = self.fetch(mailbox, &[id], spec)?;
        match fetched.pop() {
            Some(msg) if fetched.is_empty() && msg.id == id => Ok(msg.data),
            _ => Err(Error::Transport(format!(
                "mismatched response to fetch of message {id}"
            ))),
        }
    }

    pub(crate) fn logout(&mut self) -> Result<()> {
        self.transport.logout()
    }
}

/// An authenticated IMAP session; the entry point of this crate.
///
/// A session owns one connection, the mailbox list reported at login and
/// the handle registry shared by its queries. Every command serializes
/// through the connection lock, so a session can be shared across threads
/// even though the protocol allows only one in-flight command per
/// connection.
pub struct Session {
    conn: Arc<Mutex<Connection>>,
    priority: Priority,
    registry: Arc<HandleRegistry>,
    mailboxes: Vec<MailboxInfo>,
}

impl Session {
    /// Connect to the configured account over TLS and log in.
    pub fn open(config: &AccountConfig) -> Result<Session> {
        let transport = TlsTransport::connect(config)?;
        Self::build(Box::new(transport), config.priority, config.handle_cache_limit)
    }

    /// Wrap an already-authenticated transport. Lists the account's
    /// mailboxes as part of construction.
    pub fn new(transport: Box<dyn Transport>, priority: Priority) -> Result<Session> {
        Self::build(transport, priority, None)
    }

    fn build(
        transport: Box<dyn Transport>,
        priority: Priority,
        cache_limit: Option<usize>,
    ) -> Result<Session> {
        let mut conn = Connection::new(transport);
        let mailboxes = conn.list_mailboxes()?;
        log::debug!("server reported {} mailboxes", mailboxes.len());
        Ok(Session {
            conn: Arc::new(Mutex::new(conn)),
            priority,
            registry: Arc::new(HandleRegistry::with_capacity(cache_limit)),
            mailboxes,
        })
    }

    /// Mailboxes as reported by the server, in server order
    pub fn mailboxes(&self) -> &[MailboxInfo] {
        &self.mailboxes
    }

    /// Fetch priority this session was opened with
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Number of message handles currently cached for this session
    pub fn cached_handles(&self) -> usize {
        self.registry.len()
    }

    /// Open a match-all query over `name`.
    ///
    /// Fails with [`Error::NotFound`] when the server did not report a
    /// mailbox of that name at login.
    pub fn mailbox(&self, name: &str) -> Result<Query> {
        if !self.mailboxes.iter().any(|m| m.name == name) {
            return Err(Error::NotFound(format!("mailbox {name:?}")));
        }
        Ok(Query::new(
            Arc::clone(&self.conn),
            Arc::clone(&self.registry),
            Arc::from(name),
            self.priority,
            String::new(),
        ))
    }

    /// Log out and drop the connection.
    pub fn close(self) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        conn.logout()
    }
}
