//! Transport abstraction over an external IMAP client
//!
//! This crate never speaks IMAP framing itself; everything on the wire
//! goes through the [`Transport`] trait. The production implementation is
//! [`TlsTransport`] over the `imap` crate; tests substitute in-memory
//! doubles.

mod normalize;
mod tls;

pub use tls::TlsTransport;

pub(crate) use normalize::{ParsedHeaders, body_text, parse_headers, parse_message};

use crate::error::Result;
use crate::models::MessageId;

/// Which message data a fetch retrieves.
///
/// All variants use IMAP peek semantics: fetching never marks a message
/// as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchSpec {
    /// `BODY.PEEK[HEADER]`
    Header,
    /// `BODY.PEEK[TEXT]`
    Text,
    /// `BODY.PEEK[]`
    Full,
}

impl FetchSpec {
    /// The IMAP fetch attribute this spec translates to
    pub fn query(&self) -> &'static str {
        match self {
            FetchSpec::Header => "BODY.PEEK[HEADER]",
            FetchSpec::Text => "BODY.PEEK[TEXT]",
            FetchSpec::Full => "BODY.PEEK[]",
        }
    }
}

/// One mailbox as reported by `LIST`
#[derive(Debug, Clone)]
pub struct MailboxInfo {
    pub flags: Vec<String>,
    pub delimiter: Option<String>,
    pub name: String,
}

/// Raw message data returned by a fetch
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub id: MessageId,
    pub data: Vec<u8>,
}

/// Minimal synchronous command surface this crate needs from an IMAP
/// client.
///
/// Implementations are not required to serialize calls themselves; the
/// session layer funnels every command through a single lock, so at most
/// one command is in flight per connection.
pub trait Transport: Send {
    /// Mailboxes available to the authenticated account, in server order
    fn list_mailboxes(&mut self) -> Result<Vec<MailboxInfo>>;

    /// Select a mailbox; required before searching or fetching in it
    fn select(&mut self, mailbox: &str) -> Result<()>;

    /// Run a `SEARCH` with the given parenthesized query against the
    /// selected mailbox; returns matching ids in ascending order
    fn search(&mut self, query: &str) -> Result<Vec<MessageId>>;

    /// Fetch the requested data for every id in `ids`
    fn fetch(&mut self, ids: &[MessageId], spec: FetchSpec) -> Result<Vec<FetchedMessage>>;

    /// End the session
    fn logout(&mut self) -> Result<()>;
}
