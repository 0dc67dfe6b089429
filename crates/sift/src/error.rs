//! Error types shared across the crate

use std::io;

/// Convenience alias for results produced by this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure surfaced by this crate.
///
/// Errors propagate synchronously from the operation that triggered them;
/// nothing here retries a network operation on the caller's behalf.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration value, e.g. an unrecognized fetch priority
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The server rejected the login
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// TCP or TLS setup failed before a session existed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Unknown mailbox name or message id
    #[error("not found: {0}")]
    NotFound(String),

    /// Request for a message field outside the recognized set
    #[error("unknown message field: {0:?}")]
    UnknownField(String),

    /// The Date header was missing or did not parse as RFC 2822
    #[error("unparsable Date header: {0}")]
    DateParse(String),

    /// Set operations require both queries to target the same mailbox
    #[error("queries target different mailboxes: {left:?} vs {right:?}")]
    MailboxMismatch { left: String, right: String },

    /// The transport gave up waiting on the server
    #[error("transport timed out: {0}")]
    Timeout(String),

    /// Any search/fetch failure reported by the underlying transport,
    /// including short or mismatched batched fetch responses
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<imap::error::Error> for Error {
    fn from(err: imap::error::Error) -> Self {
        match err {
            imap::error::Error::Io(ref io_err)
                if matches!(
                    io_err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                ) =>
            {
                Error::Timeout(err.to_string())
            }
            other => Error::Transport(other.to_string()),
        }
    }
}
