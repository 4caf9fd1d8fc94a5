use std::sync::Arc;

use tracing::debug;

use supportdesk_core::domain::document::{RetrievalHit, RetrievalTier};
use supportdesk_core::embedding::{embed, is_zero};
use supportdesk_db::{DocumentStore, RepositoryError};

const MIN_KEYWORD_LEN: usize = 4;

/// Three-tier knowledge-base lookup. Each tier runs only when the previous one came back empty:
/// similarity over stored embeddings, then a keyword substring match, then any documents at all.
/// A non-empty collection therefore never yields an empty result.
#[derive(Clone)]
pub struct Retriever {
    documents: Arc<dyn DocumentStore>,
}

impl Retriever {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievalHit>, RepositoryError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = embed(query);
        if !is_zero(&embedding) {
            let hits = self
                .documents
                .nearest(&embedding, k)
                .await?
                .into_iter()
                .map(|scored| RetrievalHit {
                    score: scored.similarity(),
                    document: scored.document,
                    tier: RetrievalTier::Similarity,
                })
                .collect::<Vec<_>>();
            if !hits.is_empty() {
                debug!(tier = "similarity", hits = hits.len(), "retrieval tier produced hits");
                return Ok(hits);
            }
        }

        if let Some(term) = keyword_term(query) {
            let hits = self
                .documents
                .keyword(term, k)
                .await?
                .into_iter()
                .map(|document| RetrievalHit::from_tier(document, RetrievalTier::Keyword))
                .collect::<Vec<_>>();
            if !hits.is_empty() {
                debug!(tier = "keyword", hits = hits.len(), "retrieval tier produced hits");
                return Ok(hits);
            }
        }

        let hits = self
            .documents
            .any(k)
            .await?
            .into_iter()
            .map(|document| RetrievalHit::from_tier(document, RetrievalTier::Fallback))
            .collect::<Vec<_>>();
        debug!(tier = "fallback", hits = hits.len(), "retrieval tier produced hits");
        Ok(hits)
    }
}

/// Score of the best-ranked hit, the only confidence signal the escalation gate uses.
pub fn top_confidence(hits: &[RetrievalHit]) -> f64 {
    hits.first().map(|hit| hit.score).unwrap_or(0.0)
}

/// First whitespace token of at least four characters, else the whole query. Blank queries have
/// no term.
fn keyword_term(query: &str) -> Option<&str> {
    let term = query
        .split_whitespace()
        .find(|token| token.chars().count() >= MIN_KEYWORD_LEN)
        .unwrap_or(query);
    (!term.trim().is_empty()).then_some(term)
}
