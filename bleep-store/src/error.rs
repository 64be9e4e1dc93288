use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("schema migration {version} failed: {source}")]
    Migration {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("json (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
