use thiserror::Error;

#[derive(Debug, Error)]
pub enum AoiError {
    #[error(transparent)]
    Store(#[from] bleep_store::StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("no device record for {0}")]
    UnknownDevice(String),
}
