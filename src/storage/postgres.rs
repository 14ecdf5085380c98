use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::config::DbConfig;

use super::{Cursor, Document, IndexQuery, Page, StorageError, StorageGateway, Table};

pub type DbPool = Pool<Postgres>;

/// Persistent storage backend. Every item lives in a single JSONB document
/// table keyed by (table_name, item_key); index queries filter on document
/// attributes and are backed by expression indexes created in migrations.
pub struct PostgresStore {
    pool: DbPool,
}

impl PostgresStore {
    pub async fn connect(db: &DbConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .acquire_timeout(Duration::from_secs(db.acquire_timeout_secs))
            .connect(&db.url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn sort_value(doc: &Document, attr: &str) -> i64 {
    doc.get(attr).and_then(Document::as_i64).unwrap_or(0)
}

#[async_trait]
impl StorageGateway for PostgresStore {
    async fn get_item(&self, table: Table, key: &str) -> Result<Option<Document>, StorageError> {
        let doc = sqlx::query_scalar::<_, Document>(
            r#"
            SELECT doc FROM kv_items
            WHERE table_name = $1 AND item_key = $2
            "#,
        )
        .bind(table.name())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(doc)
    }

    async fn put_item(
        &self,
        table: Table,
        key: &str,
        item: Document,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO kv_items (table_name, item_key, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (table_name, item_key) DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(table.name())
        .bind(key)
        .bind(item)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query_index(&self, query: IndexQuery<'_>) -> Result<Page, StorageError> {
        let (cursor_sort, cursor_key) = match &query.cursor {
            Some(cursor) => {
                let (sort, key) = cursor.decode()?;
                (Some(sort.ok_or(StorageError::InvalidCursor)?), Some(key))
            }
            None => (None, None),
        };
        let (filter_attr, filter_value) = match query.filter {
            Some((attr, value)) => (Some(attr), Some(value)),
            None => (None, None),
        };

        let mut rows = sqlx::query_as::<_, (String, Document)>(
            r#"
            SELECT item_key, doc FROM kv_items
            WHERE table_name = $1
              AND doc ->> $2::text = $3
              AND ($4::text IS NULL OR doc -> $4::text = $5)
              AND ($6::bigint IS NULL
                   OR ((doc ->> $7::text)::bigint, item_key) < ($6::bigint, $8::text))
            ORDER BY (doc ->> $7::text)::bigint DESC, item_key DESC
            LIMIT $9
            "#,
        )
        .bind(query.table.name())
        .bind(query.key_attr)
        .bind(query.key_value)
        .bind(filter_attr)
        .bind(filter_value)
        .bind(cursor_sort)
        .bind(query.sort_attr)
        .bind(cursor_key)
        .bind((query.limit + 1) as i64)
        .fetch_all(&self.pool)
        .await?;

        let next_cursor = if rows.len() > query.limit {
            rows.truncate(query.limit);
            rows.last()
                .map(|(key, doc)| Cursor::encode(Some(sort_value(doc, query.sort_attr)), key))
        } else {
            None
        };

        Ok(Page {
            items: rows.into_iter().map(|(_, doc)| doc).collect(),
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

        let mut rows = sqlx::query_as::<_, (String, Document)>(
            r#"
            SELECT item_key, doc FROM kv_items
            WHERE table_name = $1
              AND ($2::text IS NULL OR item_key > $2)
            ORDER BY item_key
            LIMIT $3
            "#,
        )
        .bind(table.name())
        .bind(after)
        .bind((limit + 1) as i64)
        .fetch_all(&self.pool)
        .await?;

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
        let result = sqlx::query(
            r#"
            UPDATE kv_items
            SET doc = jsonb_set(doc, ARRAY[$3]::text[], $4)
            WHERE table_name = $1 AND item_key = $2
            "#,
        )
        .bind(table.name())
        .bind(key)
        .bind(attr)
        .bind(value)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::MissingItem {
                table: table.name(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
