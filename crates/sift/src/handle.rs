//! Lazy message handles
//!
//! A [`MessageHandle`] stands in for one remote message and retrieves its
//! data on demand, at most once per fetch kind. Progress is tracked by an
//! explicit [`FetchState`] machine instead of ad-hoc flags; states only
//! ever advance, because the remote message is assumed immutable for the
//! life of the session.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::config::Priority;
use crate::error::Result;
use crate::models::{Field, FieldValue, MessageFields, MessageId};
use crate::session::Connection;
use crate::transport::{self, FetchSpec};

/// How much of a message has been retrieved so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Unfetched,
    /// Header fields cached, body not retrieved
    HeaderFetched,
    /// Body text cached without headers (text-only priority)
    BodyFetched,
    FullyFetched,
}

impl FetchState {
    fn headers_cached(self) -> bool {
        matches!(self, FetchState::HeaderFetched | FetchState::FullyFetched)
    }

    fn body_cached(self) -> bool {
        matches!(self, FetchState::BodyFetched | FetchState::FullyFetched)
    }

    /// State after a fetch of `spec` completes
    fn advance(self, spec: FetchSpec) -> FetchState {
        match spec {
            FetchSpec::Full => FetchState::FullyFetched,
            FetchSpec::Header if self.body_cached() => FetchState::FullyFetched,
            FetchSpec::Header => FetchState::HeaderFetched,
            FetchSpec::Text if self.headers_cached() => FetchState::FullyFetched,
            FetchSpec::Text => FetchState::BodyFetched,
        }
    }

    /// Whether a fetch of `spec` would bring in anything new
    pub(crate) fn wants(self, spec: FetchSpec) -> bool {
        match spec {
            FetchSpec::Header => !self.headers_cached(),
            FetchSpec::Text => !self.body_cached(),
            FetchSpec::Full => self != FetchState::FullyFetched,
        }
    }
}

struct HandleData {
    state: FetchState,
    fields: MessageFields,
}

/// Lazy, cached representative of one remote message.
///
/// Handles are shared: every query over the same mailbox resolves a given
/// id to the same `Arc<MessageHandle>` (see
/// [`HandleRegistry`](crate::registry::HandleRegistry)), so a field
/// fetched through one query is served from cache through all of them.
pub struct MessageHandle {
    mailbox: Arc<str>,
    id: MessageId,
    priority: Priority,
    conn: Arc<Mutex<Connection>>,
    data: Mutex<HandleData>,
}

impl MessageHandle {
    pub(crate) fn new(
        conn: Arc<Mutex<Connection>>,
        mailbox: Arc<str>,
        id: MessageId,
        priority: Priority,
    ) -> Self {
        Self {
            mailbox,
            id,
            priority,
            conn,
            data: Mutex::new(HandleData {
                state: FetchState::Unfetched,
                fields: MessageFields::default(),
            }),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Current fetch state
    pub fn state(&self) -> FetchState {
        self.data.lock().unwrap().state
    }

    /// Snapshot of every field cached so far; performs no fetching
    pub fn cached_fields(&self) -> MessageFields {
        self.data.lock().unwrap().fields.clone()
    }

    /// Look up a field by name, fetching message data on first access.
    ///
    /// Unrecognized names fail with
    /// [`Error::UnknownField`](crate::Error::UnknownField). `None` means
    /// the message carries no value for the field.
    pub fn get(&self, name: &str) -> Result<Option<FieldValue>> {
        self.get_field(name.parse()?)
    }

    /// Typed variant of [`get`](Self::get)
    pub fn get_field(&self, field: Field) -> Result<Option<FieldValue>> {
        // Fast path: everything the field needs is already cached.
        {
            let data = self.data.lock().unwrap();
            if next_fetch(data.state, field, self.priority).is_none() {
                return Ok(read_field(&data.fields, field));
            }
        }

        // Lock order is connection before handle data, matching the batch
        // path in Query::values.
        let mut conn = self.conn.lock().unwrap();
        let mut data = self.data.lock().unwrap();
        while let Some(spec) = next_fetch(data.state, field, self.priority) {
            log::debug!(
                "fetching {} for field {} of message {} in {}",
                spec.query(),
                field.name(),
                self.id,
                self.mailbox
            );
            let raw = conn.fetch_one(&self.mailbox, self.id, spec)?;
            apply_fetch(&mut data, spec, &raw)?;
        }
        Ok(read_field(&data.fields, field))
    }

    /// Whether a batched fetch of `spec` would bring in anything new
    pub(crate) fn wants(&self, spec: FetchSpec) -> bool {
        self.data.lock().unwrap().state.wants(spec)
    }

    /// Apply the payload this handle received in a batched fetch.
    pub(crate) fn apply(&self, spec: FetchSpec, raw: &[u8]) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        apply_fetch(&mut data, spec, raw)
    }
}

impl fmt::Debug for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHandle")
            .field("mailbox", &self.mailbox)
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// The next fetch required before `field` can be answered, if any.
///
/// Headers are wanted unless the request is for `text` under text-only
/// priority; the body is wanted when the field is `text` or the priority
/// demands bodies. When both sides are missing, one full fetch covers
/// them in a single round trip.
fn next_fetch(state: FetchState, field: Field, priority: Priority) -> Option<FetchSpec> {
    let want_headers =
        !state.headers_cached() && !(field == Field::Text && priority == Priority::Text);
    let want_body =
        !state.body_cached() && (field == Field::Text || priority != Priority::Headers);
    match (want_headers, want_body) {
        (true, true) => Some(FetchSpec::Full),
        (true, false) => Some(FetchSpec::Header),
        (false, true) => Some(FetchSpec::Text),
        (false, false) => None,
    }
}

/// Store a fetch payload and advance the state machine. Slots that are
/// already populated stay untouched.
fn apply_fetch(data: &mut HandleData, spec: FetchSpec, raw: &[u8]) -> Result<()> {
    match spec {
        FetchSpec::Header => {
            if !data.state.headers_cached() {
                store_headers(&mut data.fields, transport::parse_headers(raw)?);
            }
        }
        FetchSpec::Text => {
            if !data.state.body_cached() {
                data.fields.text = Some(transport::body_text(raw));
            }
        }
        FetchSpec::Full => {
            let (headers, text) = transport::parse_message(raw)?;
            if !data.state.headers_cached() {
                store_headers(&mut data.fields, headers);
            }
            if !data.state.body_cached() {
                data.fields.text = text;
            }
        }
    }
    data.state = data.state.advance(spec);
    Ok(())
}

fn store_headers(fields: &mut MessageFields, headers: transport::ParsedHeaders) {
    fields.to = headers.to;
    fields.from = headers.from;
    fields.cc = headers.cc;
    fields.bcc = headers.bcc;
    fields.subject = headers.subject;
    fields.date = Some(headers.date);
    fields.time = Some(headers.time);
}

fn read_field(fields: &MessageFields, field: Field) -> Option<FieldValue> {
    match field {
        Field::To => fields.to.clone().map(FieldValue::Text),
        Field::From => fields.from.clone().map(FieldValue::Text),
        Field::Cc => fields.cc.clone().map(FieldValue::Text),
        Field::Bcc => fields.bcc.clone().map(FieldValue::Text),
        Field::Subject => fields.subject.clone().map(FieldValue::Text),
        Field::Text => fields.text.clone().map(FieldValue::Text),
        Field::Date => fields.date.map(FieldValue::Date),
        Field::Time => fields.time.map(FieldValue::Time),
    }
}
