//! Semantic clustering of articles into event clusters.
//!
//! Each unclustered article is embedded, compared against the centroids
//! of recently active clusters, and either attached to the best match or
//! promoted to a new cluster of its own. Membership only grows.

mod embeddings;
mod engine;
mod error;
mod similarity;

pub use embeddings::EmbeddingsClient;
pub use engine::{cluster_unclustered_articles, Assignment, ClusterOptions, ClusterStats};
pub use error::ClusterError;
pub use similarity::{cosine_similarity, running_mean};
