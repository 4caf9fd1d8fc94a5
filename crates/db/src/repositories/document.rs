use sqlx::{sqlite::SqliteRow, Row};

use supportdesk_core::domain::document::{Document, DocumentId, NewDocument};
use supportdesk_core::embedding::{from_bytes, to_bytes};

use super::{matches_keyword, rank_by_distance, DocumentStore, RepositoryError, ScoredDocument};
use crate::DbPool;

pub struct SqlDocumentStore {
    pool: DbPool,
}

impl SqlDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn insert(&self, document: NewDocument) -> Result<DocumentId, RepositoryError> {
        let embedding = document.embedding.as_deref().map(to_bytes);
        let result = sqlx::query(
            "INSERT INTO kb_docs (title, body, source, embedding) VALUES (?, ?, ?, ?)",
        )
        .bind(&document.title)
        .bind(&document.body)
        .bind(&document.source)
        .bind(embedding)
        .execute(&self.pool)
        .await?;

        Ok(DocumentId(result.last_insert_rowid()))
    }

    async fn find_by_source(&self, source: &str) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, body, source
             FROM kb_docs
             WHERE source = ?
             ORDER BY id ASC
             LIMIT 1",
        )
        .bind(source)
        .fetch_optional(&self.pool)
        .await?;

        row.map(document_from_row).transpose()
    }

    async fn nearest(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, title, body, source, embedding
             FROM kb_docs
             WHERE embedding IS NOT NULL
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let candidates = rows
            .into_iter()
            .map(|row| {
                let bytes = row.try_get::<Vec<u8>, _>("embedding")?;
                let vector = from_bytes(&bytes).ok_or_else(|| {
                    RepositoryError::Decode(format!(
                        "embedding blob of {} bytes is not a float32 vector",
                        bytes.len()
                    ))
                })?;
                Ok((document_from_row(row)?, vector))
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(rank_by_distance(candidates, embedding, limit))
    }

    async fn keyword(&self, term: &str, limit: usize) -> Result<Vec<Document>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // SQLite's LOWER() folds ASCII only; matching happens here instead.
        let needle = term.to_lowercase();
        let rows = sqlx::query(
            "SELECT id, title, body, source
             FROM kb_docs
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut matched = Vec::new();
        for row in rows {
            let document = document_from_row(row)?;
            if matches_keyword(&document, &needle) {
                matched.push(document);
                if matched.len() == limit {
                    break;
                }
            }
        }
        Ok(matched)
    }

    async fn any(&self, limit: usize) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, title, body, source
             FROM kb_docs
             ORDER BY id ASC
             LIMIT ?",
        )
        .bind(to_sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(document_from_row).collect()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kb_docs")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(count)
            .map_err(|_| RepositoryError::Decode(format!("negative document count `{count}`")))
    }
}

fn document_from_row(row: SqliteRow) -> Result<Document, RepositoryError> {
    Ok(Document {
        id: DocumentId(row.try_get("id")?),
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        source: row.try_get("source")?,
    })
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
