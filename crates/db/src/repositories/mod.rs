use async_trait::async_trait;
use thiserror::Error;

use supportdesk_core::domain::document::{Document, DocumentId, NewDocument};
use supportdesk_core::domain::order::{Order, OrderId};
use supportdesk_core::embedding::cosine_similarity;

pub mod document;
pub mod memory;

pub use document::SqlDocumentStore;
pub use memory::{InMemoryDocumentStore, InMemoryOrderRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A document paired with its cosine distance to a query embedding.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub distance: f64,
}

impl ScoredDocument {
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

/// The knowledge-base collection. Every query shape is bounded by `limit`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, document: NewDocument) -> Result<DocumentId, RepositoryError>;

    async fn find_by_source(&self, source: &str) -> Result<Option<Document>, RepositoryError>;

    /// Ascending cosine distance; documents without an embedding are skipped.
    async fn nearest(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, RepositoryError>;

    /// Case-insensitive substring match on title or body, in insertion order.
    async fn keyword(&self, term: &str, limit: usize) -> Result<Vec<Document>, RepositoryError>;

    /// Any documents, in insertion order.
    async fn any(&self, limit: usize) -> Result<Vec<Document>, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
}

/// Ranks `(document, embedding)` candidates by cosine distance to `query`. Candidates are expected
/// in insertion order; the stable sort keeps that order among equal distances.
pub(crate) fn rank_by_distance(
    candidates: Vec<(Document, Vec<f32>)>,
    query: &[f32],
    limit: usize,
) -> Vec<ScoredDocument> {
    let mut scored = candidates
        .into_iter()
        .map(|(document, embedding)| ScoredDocument {
            distance: 1.0 - cosine_similarity(&embedding, query),
            document,
        })
        .collect::<Vec<_>>();
    scored.sort_by(|left, right| left.distance.total_cmp(&right.distance));
    scored.truncate(limit);
    scored
}

/// Case-insensitive substring match on title or body with full Unicode case folding, so every
/// store answers the keyword query the same way.
pub(crate) fn matches_keyword(document: &Document, needle: &str) -> bool {
    document.title.to_lowercase().contains(needle) || document.body.to_lowercase().contains(needle)
}
