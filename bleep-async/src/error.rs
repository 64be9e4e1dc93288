use thiserror::Error;

use crate::macaddress::ParseMacAddressError;

/// Errors carrying out a Bluetooth IPC operation. Operational errors only —
/// the fatal "the D-Bus reactor task died" case is [`SpawnError`], kept
/// separate so callers can tell "this one call failed" from "the whole
/// connection is gone."
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("No Bluetooth adapters found.")]
    NoBluetoothAdapters,
    #[error(transparent)]
    DbusError(#[from] dbus::Error),
    #[error("Error parsing XML for introspection: {0}")]
    XmlParseError(#[from] serde_xml_rs::Error),
    #[error("Service or characteristic UUID {uuid} not found.")]
    UuidNotFound { uuid: uuid::Uuid },
    #[error("Error parsing UUID string: {0}")]
    UuidParseError(#[from] uuid::Error),
    #[error("Invalid characteristic flag {0:?}")]
    FlagParseError(String),
    #[error("Invalid address type {0}")]
    AddressTypeParseError(String),
    #[error("Required property {0} missing.")]
    RequiredPropertyMissing(&'static str),
    #[error("Service discovery timed out")]
    ServiceDiscoveryTimedOut,
    #[error(transparent)]
    MacAddressParseError(#[from] ParseMacAddressError),
    #[error(transparent)]
    Reliability(#[from] bleep_reliability::ReliabilityError),
    #[error("device {0} is not connected")]
    NotConnected(String),
    #[error("characteristic {0} is marked as a landmine; pass force=true to read it anyway")]
    Landmined(String),
    #[error("invalid payload spec: {0}")]
    InvalidPayloadSpec(String),
    #[error("IPC pool unavailable: the D-Bus connection is not in a usable state")]
    IpcUnavailable,
    #[error("introspection of {path} failed: {source}")]
    IntrospectionFailed { path: String, source: dbus::Error },
}

/// Error type for futures representing tasks spawned by this crate.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("D-Bus connection lost: {0}")]
    DbusConnectionLost(#[source] dbus_tokio::connection::IOResourceError),
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
