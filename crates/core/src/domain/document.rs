use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub i64);

/// A knowledge-base document as stored in the collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub body: String,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewDocument {
    pub title: String,
    pub body: String,
    pub source: String,
    pub embedding: Option<Vec<f32>>,
}

/// Which fallback tier produced a hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalTier {
    Similarity,
    Keyword,
    Fallback,
}

impl RetrievalTier {
    /// Flat score assigned to every hit of a non-similarity tier.
    pub fn sentinel_score(&self) -> Option<f64> {
        match self {
            Self::Similarity => None,
            Self::Keyword => Some(1.0),
            Self::Fallback => Some(0.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub document: Document,
    pub score: f64,
    pub tier: RetrievalTier,
}

impl RetrievalHit {
    pub fn from_tier(document: Document, tier: RetrievalTier) -> Self {
        let score = tier.sentinel_score().unwrap_or_default();
        Self { document, score, tier }
    }
}
