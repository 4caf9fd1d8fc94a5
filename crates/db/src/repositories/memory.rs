use std::collections::HashMap;

use tokio::sync::RwLock;

use supportdesk_core::domain::document::{Document, DocumentId, NewDocument};
use supportdesk_core::domain::order::{Order, OrderId};

use super::{
    matches_keyword, rank_by_distance, DocumentStore, OrderRepository, RepositoryError,
    ScoredDocument,
};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<Vec<(Document, Option<Vec<f32>>)>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, document: NewDocument) -> Result<DocumentId, RepositoryError> {
        let mut documents = self.documents.write().await;
        let id = DocumentId(documents.len() as i64 + 1);
        documents.push((
            Document { id, title: document.title, body: document.body, source: document.source },
            document.embedding,
        ));
        Ok(id)
    }

    async fn find_by_source(&self, source: &str) -> Result<Option<Document>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|(doc, _)| doc.source == source).map(|(doc, _)| doc.clone()))
    }

    async fn nearest(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, RepositoryError> {
        let documents = self.documents.read().await;
        let candidates = documents
            .iter()
            .filter_map(|(doc, vector)| vector.clone().map(|vector| (doc.clone(), vector)))
            .collect();
        Ok(rank_by_distance(candidates, embedding, limit))
    }

    async fn keyword(&self, term: &str, limit: usize) -> Result<Vec<Document>, RepositoryError> {
        let needle = term.to_lowercase();
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .map(|(doc, _)| doc)
            .filter(|doc| matches_keyword(doc, &needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn any(&self, limit: usize) -> Result<Vec<Document>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents.iter().take(limit).map(|(doc, _)| doc.clone()).collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.documents.read().await.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: HashMap<String, Order>,
}

impl InMemoryOrderRepository {
    /// The three demo orders the service ships with.
    pub fn with_fixtures() -> Self {
        let orders = [("A123", "Shipped", 2), ("B456", "Processing", 5), ("C789", "Delivered", 0)]
            .into_iter()
            .map(|(id, status, eta_days)| {
                (
                    id.to_string(),
                    Order { id: OrderId(id.to_string()), status: status.to_string(), eta_days },
                )
            })
            .collect();
        Self { orders }
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.get(&id.0).cloned())
    }
}
