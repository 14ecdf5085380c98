// ============================================================================
// Storage Gateway
// ============================================================================
//
// Abstract key-value store contract the domain services are written against.
// Two backends implement it:
// - memory::InMemoryStore - used by the test suite and for local runs
// - postgres::PostgresStore - persistent backend over a JSONB document table
//
// All operations surface failures as StorageError; there is no retry at this
// layer or above.
//
// ============================================================================

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Items are schemaless JSON documents; the services own the mapping to and
/// from their typed models.
pub type Document = serde_json::Value;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored item could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("item {key} not found in table {table}")]
    MissingItem { table: &'static str, key: String },

    #[error("malformed pagination cursor")]
    InvalidCursor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Messages,
    Groups,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Messages => "messages",
            Table::Groups => "groups",
        }
    }
}

/// Opaque pagination token handed to clients. Internally a URL-safe
/// base64-encoded position, but callers must treat it as a black box and
/// echo it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

/// Decoded cursor position. `sort` is present for index queries (the sort
/// attribute value of the last item served) and absent for key-ordered scans.
#[derive(Debug, Serialize, Deserialize)]
struct CursorPos {
    #[serde(skip_serializing_if = "Option::is_none")]
    s: Option<i64>,
    k: String,
}

impl Cursor {
    pub fn from_token(token: impl Into<String>) -> Self {
        Cursor(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn encode(sort: Option<i64>, key: &str) -> Self {
        let pos = CursorPos {
            s: sort,
            k: key.to_string(),
        };
        // CursorPos serialization cannot fail; it is a flat struct.
        let json = serde_json::to_vec(&pos).unwrap_or_default();
        Cursor(BASE64.encode(json))
    }

    pub(crate) fn decode(&self) -> Result<(Option<i64>, String), StorageError> {
        let bytes = BASE64
            .decode(&self.0)
            .map_err(|_| StorageError::InvalidCursor)?;
        let pos: CursorPos =
            serde_json::from_slice(&bytes).map_err(|_| StorageError::InvalidCursor)?;
        Ok((pos.s, pos.k))
    }
}

/// One page of results plus the cursor to resume from, when more remain.
#[derive(Debug)]
pub struct Page {
    pub items: Vec<Document>,
    pub next_cursor: Option<Cursor>,
}

/// An equality query against a secondary index, newest-first by a numeric
/// sort attribute (epoch milliseconds), with an optional equality filter on
/// a second attribute.
pub struct IndexQuery<'a> {
    pub table: Table,
    /// Index identifier; backends that maintain physical indexes use it to
    /// pick one, the in-memory backend ignores it.
    pub index: &'a str,
    pub key_attr: &'a str,
    pub key_value: &'a str,
    pub filter: Option<(&'a str, Document)>,
    /// Attribute the index is sorted on. Must hold a JSON number.
    pub sort_attr: &'a str,
    pub limit: usize,
    pub cursor: Option<Cursor>,
}

#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Fetches a single item by primary key.
    async fn get_item(&self, table: Table, key: &str) -> Result<Option<Document>, StorageError>;

    /// Inserts or replaces an item.
    async fn put_item(&self, table: Table, key: &str, item: Document)
        -> Result<(), StorageError>;

    /// Runs an index query, descending by the sort attribute.
    async fn query_index(&self, query: IndexQuery<'_>) -> Result<Page, StorageError>;

    /// Returns one key-ordered page of a full-table scan.
    async fn scan(
        &self,
        table: Table,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Page, StorageError>;

    /// Sets a single attribute on an existing item. A missing item is an
    /// error, not an upsert.
    async fn update_attribute(
        &self,
        table: Table,
        key: &str,
        attr: &str,
        value: Document,
    ) -> Result<(), StorageError>;

    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = Cursor::encode(Some(1_722_858_000_000), "abc-123");
        let (sort, key) = cursor.decode().unwrap();
        assert_eq!(sort, Some(1_722_858_000_000));
        assert_eq!(key, "abc-123");
    }

    #[test]
    fn scan_cursor_has_no_sort_component() {
        let cursor = Cursor::encode(None, "user-9");
        let (sort, key) = cursor.decode().unwrap();
        assert_eq!(sort, None);
        assert_eq!(key, "user-9");
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        let err = Cursor::from_token("not base64!!").decode().unwrap_err();
        assert!(matches!(err, StorageError::InvalidCursor));
    }
}
