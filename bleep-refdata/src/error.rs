use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefDataError {
    #[error("'{0}' is not a recognized UUID, company ID, or appearance code")]
    UnparsableInput(String),

    #[error("embedded reference table is malformed: {0}")]
    MalformedTable(#[from] serde_json::Error),
}
