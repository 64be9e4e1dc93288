//! BLEEP: Bluetooth Landscape Exploration & Enumeration Platform. This crate wires together
//! every subsystem crate in the workspace — IPC pool, reliability, store, router, agent,
//! classifier, AoI analyzer — behind one [`Context`] and the four reconnaissance mode
//! orchestrators plus the BLE-CTF flow.

pub mod ble_ctf;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod modes;

pub use config::Config;
pub use context::Context;
pub use error::CoreError;
