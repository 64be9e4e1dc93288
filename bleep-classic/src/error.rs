use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassicError {
    #[error(transparent)]
    Dbus(#[from] dbus::Error),
    #[error(transparent)]
    Async(#[from] bleep_async::CoreError),
    #[error("reachability check failed after {attempts} attempts")]
    Unreachable { attempts: u32 },
    #[error("SDP record is missing a required attribute: {0}")]
    MalformedRecord(&'static str),
    #[error("external SDP tool output could not be parsed")]
    SdpToolOutputUnparsable,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("OBEX transfer stalled: no progress for {seconds}s")]
    TransferStalled { seconds: u64 },
    #[error("PBAP repository {0} was not accepted")]
    RepositoryRejected(String),
    #[error("rfcomm bind failed: {0}")]
    RfcommBindFailed(String),
}
