//! Message identifiers and the recognized field set

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifier of a message within its mailbox (an IMAP sequence number)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MessageId(pub u32);

impl MessageId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for MessageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The message fields a handle can answer for.
///
/// `Date` and `Time` are both derived from the Date header; `Text` is the
/// message body, everything else is a header field returned verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    To,
    From,
    Cc,
    Bcc,
    Date,
    Time,
    Subject,
    Text,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::To => "to",
            Field::From => "from",
            Field::Cc => "cc",
            Field::Bcc => "bcc",
            Field::Date => "date",
            Field::Time => "time",
            Field::Subject => "subject",
            Field::Text => "text",
        }
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "to" => Ok(Field::To),
            "from" => Ok(Field::From),
            "cc" => Ok(Field::Cc),
            "bcc" => Ok(Field::Bcc),
            "date" => Ok(Field::Date),
            "time" => Ok(Field::Time),
            "subject" => Ok(Field::Subject),
            "text" => Ok(Field::Text),
            other => Err(Error::UnknownField(other.to_string())),
        }
    }
}

/// One field value as returned by a message handle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
}

/// Cached fields of one message.
///
/// Every slot is filled by at most one fetch and never cleared; the
/// remote message is assumed not to change for the life of the session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageFields {
    pub to: Option<String>,
    pub from: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub subject: Option<String>,
    pub text: Option<String>,
}
