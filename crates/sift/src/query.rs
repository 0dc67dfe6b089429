//! Filtered mailbox views
//!
//! A [`Query`] is "messages in mailbox M matching search fragment S".
//! Queries are immutable: every filter returns a new query with an
//! extended fragment and leaves the original untouched. The id list is
//! resolved once, on first need, and never refreshed — a query is a
//! snapshot of the mailbox at resolution time.

use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};

use crate::config::Priority;
use crate::error::{Error, Result};
use crate::handle::MessageHandle;
use crate::models::MessageId;
use crate::registry::HandleRegistry;
use crate::search;
use crate::session::Connection;
use crate::transport::FetchSpec;

type Resolved = Vec<(MessageId, Arc<MessageHandle>)>;

pub struct Query {
    mailbox: Arc<str>,
    fragment: String,
    priority: Priority,
    conn: Arc<Mutex<Connection>>,
    registry: Arc<HandleRegistry>,
    resolved: Mutex<Option<Resolved>>,
}

impl Query {
    pub(crate) fn new(
        conn: Arc<Mutex<Connection>>,
        registry: Arc<HandleRegistry>,
        mailbox: Arc<str>,
        priority: Priority,
        fragment: String,
    ) -> Self {
        Self {
            mailbox,
            fragment,
            priority,
            conn,
            registry,
            resolved: Mutex::new(None),
        }
    }

    /// A sibling query over the same mailbox with a different fragment
    fn derive(&self, fragment: String) -> Query {
        Query::new(
            Arc::clone(&self.conn),
            Arc::clone(&self.registry),
            Arc::clone(&self.mailbox),
            self.priority,
            fragment,
        )
    }

    /// Mailbox this query is scoped to
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Accumulated IMAP SEARCH fragment; empty means match-all
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    // --- filters ---

    /// Restrict to messages addressed to `addr`
    pub fn to(&self, addr: &str) -> Query {
        self.derive(search::append_term(&self.fragment, "TO", addr))
    }

    /// Restrict to messages sent by `addr`
    pub fn from(&self, addr: &str) -> Query {
        self.derive(search::append_term(&self.fragment, "FROM", addr))
    }

    /// Restrict to messages cc'd to `addr`
    pub fn cc(&self, addr: &str) -> Query {
        self.derive(search::append_term(&self.fragment, "CC", addr))
    }

    /// Restrict to messages bcc'd to `addr`
    pub fn bcc(&self, addr: &str) -> Query {
        self.derive(search::append_term(&self.fragment, "BCC", addr))
    }

    /// Restrict to messages whose subject contains `text`
    pub fn subject(&self, text: &str) -> Query {
        self.derive(search::append_term(&self.fragment, "SUBJECT", text))
    }

    /// Messages dated `start` exactly, or within `[start, end)` when
    /// `end` is given
    pub fn dates(&self, start: NaiveDate, end: Option<NaiveDate>) -> Query {
        match end {
            Some(end) => {
                let since =
                    search::append_term(&self.fragment, "SINCE", &search::format_date(start));
                self.derive(search::append_term(&since, "BEFORE", &search::format_date(end)))
            }
            None => {
                self.derive(search::append_term(&self.fragment, "ON", &search::format_date(start)))
            }
        }
    }

    /// Messages dated today, local time
    pub fn today(&self) -> Query {
        self.dates(Local::now().date_naive(), None)
    }

    // --- set composition ---

    /// Messages matching this query or `other`.
    ///
    /// Both queries must target the same mailbox; combining across
    /// mailboxes fails with [`Error::MailboxMismatch`] instead of
    /// producing a query that silently searches the wrong one.
    pub fn union(&self, other: &Query) -> Result<Query> {
        self.check_same_mailbox(other)?;
        Ok(self.derive(search::or(&self.fragment, &other.fragment)))
    }

    /// Messages matching this query but not `other`; same-mailbox rule as
    /// [`union`](Self::union)
    pub fn difference(&self, other: &Query) -> Result<Query> {
        self.check_same_mailbox(other)?;
        Ok(self.derive(search::difference(&self.fragment, &other.fragment)))
    }

    /// Messages in the mailbox not matching this query
    pub fn complement(&self) -> Query {
        self.derive(search::complement(&self.fragment))
    }

    fn check_same_mailbox(&self, other: &Query) -> Result<()> {
        if self.mailbox != other.mailbox {
            return Err(Error::MailboxMismatch {
                left: self.mailbox.to_string(),
                right: other.mailbox.to_string(),
            });
        }
        Ok(())
    }

    // --- resolution ---

    /// Resolve and memoize the matching ids; idempotent. Handles are
    /// created through the registry, so other queries over the same
    /// mailbox resolve to the same instances.
    fn resolve(&self) -> Result<Resolved> {
        let mut resolved = self.resolved.lock().unwrap();
        if let Some(entries) = resolved.as_ref() {
            return Ok(entries.clone());
        }

        let query = search::search_argument(&self.fragment);
        let ids = {
            let mut conn = self.conn.lock().unwrap();
            conn.search(&self.mailbox, &query)?
        };
        log::debug!("{} matched {} messages in {}", query, ids.len(), self.mailbox);

        let entries: Resolved = ids
            .into_iter()
            .map(|id| {
                let handle = self.registry.get_or_create(&self.mailbox, id, || {
                    MessageHandle::new(
                        Arc::clone(&self.conn),
                        Arc::clone(&self.mailbox),
                        id,
                        self.priority,
                    )
                });
                (id, handle)
            })
            .collect();

        *resolved = Some(entries.clone());
        Ok(entries)
    }

    /// Number of matching messages
    pub fn count(&self) -> Result<usize> {
        Ok(self.resolve()?.len())
    }

    /// Matching message ids, in server order
    pub fn ids(&self) -> Result<Vec<MessageId>> {
        Ok(self.resolve()?.into_iter().map(|(id, _)| id).collect())
    }

    /// Whether `id` matched this query; resolves ids but fetches no fields
    pub fn contains(&self, id: MessageId) -> Result<bool> {
        Ok(self.resolve()?.iter().any(|(m, _)| *m == id))
    }

    /// Handle for `id`.
    ///
    /// Fails with [`Error::NotFound`] when `id` is not in the resolved
    /// set, unless a broader query over the same mailbox already cached a
    /// handle for it.
    pub fn get(&self, id: MessageId) -> Result<Arc<MessageHandle>> {
        let entries = self.resolve()?;
        if let Some((_, handle)) = entries.iter().find(|(m, _)| *m == id) {
            return Ok(Arc::clone(handle));
        }
        self.registry.get(&self.mailbox, id).ok_or_else(|| {
            Error::NotFound(format!("message {id} in mailbox {:?}", self.mailbox))
        })
    }

    /// Resolve, batch-fetch everything the session priority still
    /// considers unfetched, and return the handles in server order.
    ///
    /// One fetch command covers all pending messages — far cheaper than a
    /// round trip per message. Repeated calls fetch nothing further.
    pub fn values(&self) -> Result<Vec<Arc<MessageHandle>>> {
        let entries = self.resolve()?;
        let spec = self.batch_spec();

        let ids: Vec<MessageId> = entries
            .iter()
            .filter(|(_, handle)| handle.wants(spec))
            .map(|(id, _)| *id)
            .collect();

        if !ids.is_empty() {
            log::debug!(
                "batch fetching {} of {} messages in {}",
                ids.len(),
                entries.len(),
                self.mailbox
            );
            let fetched = {
                let mut conn = self.conn.lock().unwrap();
                conn.fetch(&self.mailbox, &ids, spec)?
            };
            if fetched.len() != ids.len() {
                return Err(Error::Transport(format!(
                    "batched fetch asked for {} messages, server answered for {}",
                    ids.len(),
                    fetched.len()
                )));
            }
            for msg in &fetched {
                let (_, handle) = entries
                    .iter()
                    .find(|(id, _)| *id == msg.id)
                    .ok_or_else(|| {
                        Error::Transport(format!(
                            "batched fetch answered for unrequested message {}",
                            msg.id
                        ))
                    })?;
                handle.apply(spec, &msg.data)?;
            }
        }

        Ok(entries.into_iter().map(|(_, handle)| handle).collect())
    }

    /// Iterate over the resolved handles; equivalent to
    /// [`values`](Self::values)
    pub fn iter(&self) -> Result<std::vec::IntoIter<Arc<MessageHandle>>> {
        Ok(self.values()?.into_iter())
    }

    fn batch_spec(&self) -> FetchSpec {
        match self.priority {
            Priority::Headers => FetchSpec::Header,
            Priority::Text => FetchSpec::Text,
            Priority::All => FetchSpec::Full,
        }
    }
}
