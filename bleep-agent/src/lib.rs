//! BLEEP's pairing agent: an `org.bluez.Agent1` object exposed over D-Bus
//! with `dbus-crossroads`, a capability profile chosen at registration, a
//! pairing state machine, and a filesystem-backed bond store.

mod agent;
mod bond;
mod capability;
mod error;
mod io;
mod state;

pub use agent::{reregister_on_restart, PairingAgent};
pub use bond::{BondRecord, BondStore, FilesystemBondStore};
pub use capability::Capability;
pub use error::AgentError;
pub use io::{AutoAccept, Callback, IoHandler};
pub use state::PairingState;
