pub mod config;
pub mod domain;
pub mod embedding;
pub mod errors;
pub mod metrics;

pub use domain::document::{Document, DocumentId, NewDocument, RetrievalHit, RetrievalTier};
pub use domain::intent::Intent;
pub use domain::order::{Order, OrderId};
pub use domain::turn::Turn;
pub use embedding::{cosine_similarity, embed, EMBEDDING_DIM};
pub use errors::{ApplicationError, InterfaceError};
pub use metrics::{LatencyBucket, LatencyTimer, MetricsRegistry, MetricsSnapshot};
