//! Classic Bluetooth support for BLEEP: SDP discovery and analysis, an RFCOMM
//! channel helper, and OBEX/PBAP phonebook transfer. This crate owns its own
//! session-bus connection to obexd, separate from [`bleep_async::IpcPool`]'s
//! system-bus connection to bluetoothd.

mod error;
mod obex_agent;
mod pbap;
mod pinger;
mod rfcomm;
mod sdp;

pub use error::ClassicError;
pub use obex_agent::ObexAgent;
pub use pbap::{pull_all, PbapPullMetadata, VCardFormat, DEFAULT_WATCHDOG_SECS};
pub use pinger::{check_reachable, L2Ping, Pinger, DEFAULT_PING_ATTEMPTS, DEFAULT_PING_BUDGET};
pub use rfcomm::RfcommStream;
pub use sdp::{
    analyze, discover_connectionless, discover_full, discover_via_external_tool, Confidence,
    InferredVersion, SdpAnalysis, SdpRecord, VersionAnomaly,
};
