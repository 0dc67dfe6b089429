//! Domain models

mod message;

pub use message::{Field, FieldValue, MessageFields, MessageId};
