use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Cursor, Document, IndexQuery, Page, StorageError, StorageGateway, Table};

/// In-memory storage backend. Tables are key-ordered maps behind a single
/// lock; queries filter and sort in place. State lives for the lifetime of
/// the process only.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<&'static str, BTreeMap<String, Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_value(doc: &Document, attr: &str) -> i64 {
    doc.get(attr).and_then(Document::as_i64).unwrap_or(0)
}

#[async_trait]
impl StorageGateway for InMemoryStore {
    async fn get_item(&self, table: Table, key: &str) -> Result<Option<Document>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table.name())
            .and_then(|items| items.get(key))
            .cloned())
    }

    async fn put_item(
        &self,
        table: Table,
        key: &str,
        item: Document,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        tables
            .entry(table.name())
            .or_default()
            .insert(key.to_string(), item);
        Ok(())
    }

    async fn query_index(&self, query: IndexQuery<'_>) -> Result<Page, StorageError> {
        let start = match &query.cursor {
            Some(cursor) => {
                let (sort, key) = cursor.decode()?;
                Some((sort.ok_or(StorageError::InvalidCursor)?, key))
            }
            None => None,
        };

        let tables = self.tables.read().await;
        let mut matches: Vec<(i64, String, Document)> = tables
            .get(query.table.name())
            .map(|items| {
                items
                    .iter()
                    .filter(|(_, doc)| {
                        doc.get(query.key_attr).and_then(Document::as_str)
                            == Some(query.key_value)
                    })
                    .filter(|(_, doc)| match &query.filter {
                        Some((attr, expected)) => doc.get(*attr) == Some(expected),
                        None => true,
                    })
                    .map(|(key, doc)| (sort_value(doc, query.sort_attr), key.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();

        // Newest first; ties broken by key so pagination stays stable.
        matches.sort_by(|a, b| (b.0, &b.1).cmp(&(a.0, &a.1)));

        if let Some((after_sort, after_key)) = start {
            matches.retain(|(sort, key, _)| (*sort, key.as_str()) < (after_sort, after_key.as_str()));
        }

        let next_cursor = if matches.len() > query.limit {
            matches.truncate(query.limit);
            matches
                .last()
                .map(|(sort, key, _)| Cursor::encode(Some(*sort), key))
        } else {
            None
        };

        Ok(Page {
            items: matches.into_iter().map(|(_, _, doc)| doc).collect(),
            next_cursor,
        })
    }

    async fn scan(
        &self,
        table: Table,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> Result<Page, StorageError> {
        let after = match &cursor {
            Some(cursor) => Some(cursor.decode()?.1),
            None => None,
        };

        let tables = self.tables.read().await;
        let mut rows: Vec<(String, Document)> = tables
            .get(table.name())
            .map(|items| {
                items
                    .iter()
                    .filter(|(key, _)| match &after {
                        Some(after) => key.as_str() > after.as_str(),
                        None => true,
                    })
                    .map(|(key, doc)| (key.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            rows.last().map(|(key, _)| Cursor::encode(None, key))
        } else {
            None
        };

        Ok(Page {
            items: rows.into_iter().map(|(_, doc)| doc).collect(),
            next_cursor,
        })
    }

    async fn update_attribute(
        &self,
        table: Table,
        key: &str,
        attr: &str,
        value: Document,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let doc = tables
            .get_mut(table.name())
            .and_then(|items| items.get_mut(key))
            .ok_or_else(|| StorageError::MissingItem {
                table: table.name(),
                key: key.to_string(),
            })?;
        if let Some(object) = doc.as_object_mut() {
            object.insert(attr.to_string(), value);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(id: &str, receiver: &str, ts: i64, read: bool) -> Document {
        json!({
            "messageId": id,
            "receiverId": receiver,
            "timestamp": ts,
            "read": read,
        })
    }

    fn unread_query<'a>(receiver: &'a str, limit: usize, cursor: Option<Cursor>) -> IndexQuery<'a> {
        IndexQuery {
            table: Table::Messages,
            index: "receiverId-timestamp-index",
            key_attr: "receiverId",
            key_value: receiver,
            filter: Some(("read", json!(false))),
            sort_attr: "timestamp",
            limit,
            cursor,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryStore::new();
        store
            .put_item(Table::Users, "u1", json!({"userId": "u1"}))
            .await
            .unwrap();
        let item = store.get_item(Table::Users, "u1").await.unwrap();
        assert_eq!(item, Some(json!({"userId": "u1"})));
        assert_eq!(store.get_item(Table::Users, "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn query_filters_and_sorts_newest_first() {
        let store = InMemoryStore::new();
        store
            .put_item(Table::Messages, "m1", message("m1", "bob", 100, false))
            .await
            .unwrap();
        store
            .put_item(Table::Messages, "m2", message("m2", "bob", 300, false))
            .await
            .unwrap();
        store
            .put_item(Table::Messages, "m3", message("m3", "bob", 200, true))
            .await
            .unwrap();
        store
            .put_item(Table::Messages, "m4", message("m4", "eve", 400, false))
            .await
            .unwrap();

        let page = store.query_index(unread_query("bob", 10, None)).await.unwrap();
        let ids: Vec<&str> = page
            .items
            .iter()
            .map(|doc| doc["messageId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["m2", "m1"]);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn query_pages_through_with_cursor() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            let id = format!("m{i}");
            store
                .put_item(Table::Messages, &id, message(&id, "bob", 100 + i, false))
                .await
                .unwrap();
        }

        let first = store.query_index(unread_query("bob", 3, None)).await.unwrap();
        assert_eq!(first.items.len(), 3);
        let cursor = first.next_cursor.expect("more items should remain");

        let second = store
            .query_index(unread_query("bob", 3, Some(cursor)))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.next_cursor.is_none());

        let mut seen: Vec<i64> = first
            .items
            .iter()
            .chain(second.items.iter())
            .map(|doc| doc["timestamp"].as_i64().unwrap())
            .collect();
        seen.dedup();
        assert_eq!(seen, vec![104, 103, 102, 101, 100]);
    }

    #[tokio::test]
    async fn scan_pages_in_key_order() {
        let store = InMemoryStore::new();
        for key in ["a", "b", "c"] {
            store
                .put_item(Table::Users, key, json!({"userId": key}))
                .await
                .unwrap();
        }

        let first = store.scan(Table::Users, 2, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let second = store
            .scan(Table::Users, 2, first.next_cursor)
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn update_attribute_requires_existing_item() {
        let store = InMemoryStore::new();
        let err = store
            .update_attribute(Table::Messages, "ghost", "read", json!(true))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingItem { .. }));

        store
            .put_item(Table::Messages, "m1", message("m1", "bob", 1, false))
            .await
            .unwrap();
        store
            .update_attribute(Table::Messages, "m1", "read", json!(true))
            .await
            .unwrap();
        let doc = store.get_item(Table::Messages, "m1").await.unwrap().unwrap();
        assert_eq!(doc["read"], json!(true));
    }
}
