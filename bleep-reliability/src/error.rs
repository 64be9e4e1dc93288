use std::time::Duration;
use thiserror::Error;

use crate::timeouts::OperationKind;

/// Errors raised by the reliability layer itself. Transport- and
/// device-level errors from the crates that *use* this layer (bleep-async,
/// bleep-classic, bleep-agent) carry their own error enums and convert an
/// `OperationTimeout` into their own vocabulary at the boundary.
#[derive(Debug, Error)]
pub enum ReliabilityError {
    #[error("operation {kind} exceeded its {budget:?} budget")]
    OperationTimeout {
        kind: OperationKind,
        budget: Duration,
    },
    #[error("operation {kind} failed: {source}")]
    Operation {
        kind: OperationKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
