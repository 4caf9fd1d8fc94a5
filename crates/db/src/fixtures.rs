//! Knowledge-base seed documents.
//!
//! Seeding is idempotent: a document whose `source` already exists in the collection is skipped, so
//! `supportdesk seed` can be rerun safely against a populated database.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use supportdesk_core::domain::document::NewDocument;
use supportdesk_core::embedding::embed;

use crate::repositories::{DocumentStore, RepositoryError};

pub const DEFAULT_FAQ_PATH: &str = "data/kb/sample_faq.md";
pub const FAQ_TITLE: &str = "FAQ: Returns & Refunds";
const FAQ_FALLBACK_BODY: &str = "Returns accepted within 30 days with receipt.";

const BUILTIN_DOCUMENTS: &[SeedDocument<'static>] = &[
    SeedDocument {
        title: "Shipping",
        body: "Standard shipping takes 3–5 business days.",
        source: "seed:shipping",
    },
    SeedDocument {
        title: "Return Policy",
        body: "You can return items within 30 days with receipt.",
        source: "seed:return",
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedDocument<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub source: &'a str,
}

impl SeedDocument<'_> {
    /// Embeds title and body together, the same text the retriever later compares against.
    pub fn to_new_document(&self) -> NewDocument {
        NewDocument {
            title: self.title.to_string(),
            body: self.body.to_string(),
            source: self.source.to_string(),
            embedding: Some(embed(&format!("{}\n{}", self.title, self.body))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub inserted: Vec<String>,
    pub skipped: Vec<String>,
    pub used_faq_fallback: bool,
}

pub struct KnowledgeBaseSeed;

impl KnowledgeBaseSeed {
    /// Loads the FAQ file at `faq_path` plus the built-in documents. A missing FAQ file falls back
    /// to a one-line returns answer; other read errors are reported.
    pub async fn load(
        store: &dyn DocumentStore,
        faq_path: &Path,
    ) -> Result<SeedResult, RepositoryError> {
        let (faq_body, used_faq_fallback) = match tokio::fs::read_to_string(faq_path).await {
            Ok(body) => (body, false),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                (FAQ_FALLBACK_BODY.to_string(), true)
            }
            Err(error) => {
                return Err(RepositoryError::Decode(format!(
                    "failed to read FAQ file {}: {error}",
                    faq_path.display()
                )))
            }
        };

        let faq_source = faq_path.to_string_lossy().into_owned();
        let faq = SeedDocument { title: FAQ_TITLE, body: &faq_body, source: &faq_source };

        let mut result = SeedResult { used_faq_fallback, ..SeedResult::default() };
        for document in std::iter::once(faq).chain(BUILTIN_DOCUMENTS.iter().copied()) {
            if store.find_by_source(document.source).await?.is_some() {
                result.skipped.push(document.source.to_string());
                continue;
            }
            store.insert(document.to_new_document()).await?;
            result.inserted.push(document.source.to_string());
        }

        info!(
            event_name = "kb.seed.completed",
            inserted = result.inserted.len(),
            skipped = result.skipped.len(),
            used_faq_fallback = result.used_faq_fallback,
            "knowledge base seed completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::{KnowledgeBaseSeed, FAQ_TITLE};
    use crate::repositories::{DocumentStore, InMemoryDocumentStore};

    #[tokio::test]
    async fn seeds_faq_file_and_builtin_documents() {
        let mut faq = NamedTempFile::new().expect("temp faq");
        writeln!(faq, "Q: How long do refunds take?\nA: Refunds post within 5 business days.")
            .expect("write faq");
        let store = InMemoryDocumentStore::new();

        let result = KnowledgeBaseSeed::load(&store, faq.path()).await.expect("seed");

        assert_eq!(result.inserted.len(), 3);
        assert!(!result.used_faq_fallback);
        let docs = store.any(10).await.expect("list");
        assert_eq!(docs[0].title, FAQ_TITLE);
        assert!(docs[0].body.contains("Refunds post within 5 business days."));
        assert_eq!(docs[1].source, "seed:shipping");
        assert_eq!(docs[2].source, "seed:return");
    }

    #[tokio::test]
    async fn missing_faq_file_uses_fallback_body() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let store = InMemoryDocumentStore::new();

        let result = KnowledgeBaseSeed::load(&store, &dir.path().join("absent.md"))
            .await
            .expect("seed");

        assert!(result.used_faq_fallback);
        let docs = store.any(1).await.expect("list");
        assert_eq!(docs[0].body, "Returns accepted within 30 days with receipt.");
    }

    #[tokio::test]
    async fn reseeding_skips_existing_sources() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.md");
        let store = InMemoryDocumentStore::new();

        KnowledgeBaseSeed::load(&store, &path).await.expect("first seed");
        let second = KnowledgeBaseSeed::load(&store, &path).await.expect("second seed");

        assert!(second.inserted.is_empty());
        assert_eq!(second.skipped.len(), 3);
        assert_eq!(store.count().await.expect("count"), 3);
    }
}
