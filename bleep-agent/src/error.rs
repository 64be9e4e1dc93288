use thiserror::Error;

use crate::state::PairingState;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Dbus(#[from] dbus::Error),
    #[error("pairing cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: PairingState, to: PairingState },
    #[error("pairing with {0} was rejected by the configured IO handler")]
    Rejected(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("no bond found for {0}")]
    UnknownBond(String),
}

impl From<AgentError> for dbus::MethodErr {
    fn from(error: AgentError) -> Self {
        dbus::MethodErr::failed(&error.to_string())
    }
}
