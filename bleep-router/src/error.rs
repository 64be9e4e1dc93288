use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no route named {0}")]
    UnknownRoute(String),
    #[error("no saved config named {0}")]
    UnknownConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid regex in filter: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error(transparent)]
    Store(#[from] bleep_store::StoreError),
}
