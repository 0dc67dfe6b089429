//! Lazy, filter-composable access to IMAP mailboxes
//!
//! This crate delegates the wire protocol, TLS and authentication to an
//! external IMAP client behind a small [`Transport`] trait and layers
//! three things on top:
//! - [`Session`]: authenticates and lists the account's mailboxes,
//! - [`Query`]: immutable, composable search filters that resolve lazily
//!   into message ids,
//! - [`MessageHandle`]: per-message field caches filled on first access
//!   and shared — via the session's [`HandleRegistry`] — by every query
//!   over the same mailbox.

pub mod config;
pub mod error;
pub mod handle;
pub mod models;
pub mod query;
pub mod registry;
mod search;
pub mod session;
pub mod transport;

pub use config::{AccountConfig, DEFAULT_IMAP_PORT, Priority};
pub use error::{Error, Result};
pub use handle::{FetchState, MessageHandle};
pub use models::{Field, FieldValue, MessageFields, MessageId};
pub use query::Query;
pub use registry::HandleRegistry;
pub use session::Session;
pub use transport::{FetchSpec, FetchedMessage, MailboxInfo, TlsTransport, Transport};
