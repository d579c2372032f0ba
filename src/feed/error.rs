use thiserror::Error;

pub type Result<T, E = FeedError> = std::result::Result<T, E>;

/// Failure of a single data source call. The merge turns these into empty
/// results for that source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error("background query task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no viewer identity selected")]
    NoIdentity,

    #[error("viewer changed while the feed was loading")]
    Superseded,

    #[error("could not resolve viewer: {0}")]
    Identity(#[source] SourceError),
}

impl FeedError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoIdentity => "no_identity",
            Self::Superseded => "superseded",
            Self::Identity(_) => "identity_unresolved",
        }
    }
}
