// ============================================================================
// Domain Services
// ============================================================================
//
// The services own the domain rules (existence checks, block enforcement,
// membership semantics) and talk to storage exclusively through the
// StorageGateway trait, so any backend can sit underneath them.
//
// ============================================================================

pub mod groups;
pub mod messaging;
pub mod users;

use serde::de::DeserializeOwned;

use crate::storage::{Cursor, Document, StorageError};

/// A typed page of service results.
#[derive(Debug)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

pub(crate) fn decode<T: DeserializeOwned>(doc: Document) -> Result<T, StorageError> {
    Ok(serde_json::from_value(doc)?)
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<Document, StorageError> {
    Ok(serde_json::to_value(value)?)
}
