use bleep_async::CoreError as AsyncCoreError;
use thiserror::Error;

/// Top-level error aggregating every subsystem crate's own error type. Orchestrators and
/// `main` propagate this rather than matching on individual crates' errors, the same
/// "operational error wraps fatal task error" split `bleep-async` itself uses internally.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Async(#[from] AsyncCoreError),
    #[error(transparent)]
    Spawn(#[from] bleep_async::SpawnError),
    #[error(transparent)]
    Store(#[from] bleep_store::StoreError),
    #[error(transparent)]
    Router(#[from] bleep_router::RouterError),
    #[error(transparent)]
    Classic(#[from] bleep_classic::ClassicError),
    #[error(transparent)]
    Agent(#[from] bleep_agent::AgentError),
    #[error(transparent)]
    Aoi(#[from] bleep_aoi::AoiError),
    #[error(transparent)]
    Reliability(#[from] bleep_reliability::ReliabilityError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no Bluetooth adapter is present")]
    NoAdapter,
    #[error("BLE_CTF_MAC is not set")]
    CtfMacNotConfigured,
}
