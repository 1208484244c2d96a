use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("embeddings error: {0}")]
    Embeddings(String),

    #[error(transparent)]
    Db(#[from] newsflow_db::DbError),
}
