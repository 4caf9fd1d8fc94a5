pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{KnowledgeBaseSeed, SeedDocument, SeedResult, DEFAULT_FAQ_PATH};
pub use repositories::{
    DocumentStore, InMemoryDocumentStore, InMemoryOrderRepository, OrderRepository,
    RepositoryError, ScoredDocument, SqlDocumentStore,
};
