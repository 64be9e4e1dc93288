//! Async IPC pool, adapter/discovery state machine, and device/GATT
//! enumeration engine for BLEEP, built on top of an async wrapper around
//! BlueZ's D-Bus interface. Start by creating an [`IpcPool`] with
//! [`IpcPool::connect`].

mod adapter;
mod bleuuid;
mod device;
mod error;
mod events;
mod gatt;
mod ids;
mod introspect;
mod macaddress;
mod messagestream;
mod pool;

pub use adapter::AdapterInfo;
pub use bleuuid::{uuid_from_u16, uuid_from_u32, BleUuid};
pub use device::{AddressType, DeviceInfo, DeviceLifecycle};
pub use error::{CoreError, SpawnError};
pub use events::{AdapterEvent, BluetoothEvent, CharacteristicEvent, DeviceEvent};
pub use gatt::{
    CharacteristicFlags, CharacteristicInfo, DescriptorInfo, GattMapping, GattOperation,
    LandmineMap, ObservedError, PayloadSpec, PermissionMap, ServiceInfo,
};
pub use ids::{AdapterId, CharacteristicId, DescriptorId, DeviceId, ServiceId};
pub use macaddress::{MacAddress, ParseMacAddressError};
pub use pool::{DiscoveryFilter, IpcPool, ScanVariant, Transport, WriteOptions, WriteType};

use std::collections::HashMap;

use bleep_reliability::{escalate, RecoveryIntent, RecoveryStage};

/// Everything gathered by one enumeration pass: the GATT shape plus the landmine and permission
/// bookkeeping accumulated along the way.
#[derive(Clone, Debug, Default)]
pub struct EnumerationResult {
    pub mapping: GattMapping,
    pub landmines: LandmineMap,
    pub permissions: PermissionMap,
}

/// One of the four enumeration policies, sharing a common read/write kernel but diverging in
/// retry behaviour and which operations they attempt at all.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EnumerationVariant {
    Passive,
    Naggy,
    Pokey,
    Brute,
}

impl EnumerationVariant {
    fn rounds(self) -> u32 {
        match self {
            Self::Passive => 1,
            Self::Naggy | Self::Pokey | Self::Brute => 3,
        }
    }

    fn probes_writes(self) -> bool {
        matches!(self, Self::Pokey)
    }
}

/// Connects to `device`, waits for service discovery, walks the GATT tree and runs one
/// enumeration pass over every readable (and, for `pokey`, writable) characteristic.
pub async fn connect_and_enumerate(
    pool: &IpcPool,
    device: &DeviceId,
    variant: EnumerationVariant,
) -> Result<(DeviceInfo, EnumerationResult), CoreError> {
    pool.connect_device(device).await?;

    let info = pool.get_device_info(device).await?;
    let mut mapping = GattMapping::default();
    for service in pool.get_services(device).await? {
        for characteristic in pool.get_characteristics(&service.id).await? {
            mapping.characteristics.push(characteristic);
        }
        mapping.services.push(service);
    }

    let mut landmines = LandmineMap::new();
    let mut permissions = PermissionMap::new();

    for round in 0..variant.rounds() {
        for characteristic in mapping.characteristics.clone() {
            if !characteristic.flags.contains(CharacteristicFlags::READ) {
                continue;
            }
            if landmines.is_landmined(&characteristic.id) {
                continue;
            }
            if let Err(err) = pool.read_characteristic(&characteristic.id, 0).await {
                let recovered = recover_from_read_failure(pool, device, &characteristic.id, &err).await;
                let final_err = if recovered {
                    pool.read_characteristic(&characteristic.id, 0).await.err()
                } else {
                    Some(err)
                };
                if let Some(err) = final_err {
                    record_read_failure(&mut landmines, &mut permissions, &characteristic.id, &err, round);
                }
            }
        }
        if variant.probes_writes() {
            for characteristic in mapping.characteristics.clone() {
                if !characteristic.flags.contains(CharacteristicFlags::WRITE) {
                    continue;
                }
                if landmines.is_landmined(&characteristic.id) {
                    continue;
                }
                for probe in [0x00u8, 0x01u8] {
                    write_with_retry(pool, &characteristic.id, vec![probe], &mut permissions).await;
                }
            }
        }
    }

    Ok((info, EnumerationResult { mapping, landmines, permissions }))
}

/// Writes `payload` to `id`, retrying once with an alternate [`WriteType`] if BlueZ rejects the
/// first attempt as `InvalidArgs` — some characteristics only accept a write-without-response
/// where the default request type is tried first, and vice versa.
async fn write_with_retry(
    pool: &IpcPool,
    id: &CharacteristicId,
    payload: Vec<u8>,
    permissions: &mut PermissionMap,
) {
    let first = WriteOptions::default();
    let err = match pool.write_characteristic(id, payload.clone(), first).await {
        Ok(()) => {
            permissions.record(id.clone(), GattOperation::Write, ObservedError::Other);
            return;
        }
        Err(err) => err,
    };
    let observed = classify_core_error(&err);
    let final_observed = if observed == ObservedError::InvalidArgs {
        let alternate = WriteOptions { write_type: Some(alternate_write_type(first.write_type)), ..first };
        match pool.write_characteristic(id, payload, alternate).await {
            Ok(()) => return,
            Err(retry_err) => classify_core_error(&retry_err),
        }
    } else {
        observed
    };
    permissions.record(id.clone(), GattOperation::Write, final_observed);
}

fn alternate_write_type(current: Option<WriteType>) -> WriteType {
    match current {
        Some(WriteType::WithoutResponse) => WriteType::WithResponse,
        _ => WriteType::WithoutResponse,
    }
}

/// Responds to a failed characteristic read according to how it was classified: a `Timeout`
/// runs the full staged recovery pipeline, `NotConnected` tries a single reconnect first and
/// only escalates if that alone doesn't clear it. Returns whether the connection looks usable
/// again, in which case the caller retries the read once.
async fn recover_from_read_failure(
    pool: &IpcPool,
    device: &DeviceId,
    _characteristic: &CharacteristicId,
    err: &CoreError,
) -> bool {
    match classify_core_error(err) {
        ObservedError::Timeout => recover_connection(pool, device).await,
        ObservedError::NotConnected => {
            if pool.connect_device(device).await.is_ok() {
                return true;
            }
            recover_connection(pool, device).await
        }
        _ => false,
    }
}

/// Runs the staged recovery pipeline against `device`'s connection, escalating from a plain
/// disconnect/reconnect through proxy invalidation and an adapter power cycle. Daemon restart
/// is the last stage in [`RecoveryStage::ALL`] but this crate has no way to restart `bluetoothd`
/// itself, so that stage always reports failure and lets the caller give up.
async fn recover_connection(pool: &IpcPool, device: &DeviceId) -> bool {
    let adapter = device.adapter();
    let intent = RecoveryIntent {
        adapter_path: adapter.to_string(),
        device_path: Some(device.to_string()),
        subscribed_characteristics: vec![],
    };
    let outcomes = escalate(&intent, |stage, _intent| {
        let pool = pool.clone();
        let device = device.clone();
        let adapter = adapter.clone();
        async move {
            match stage {
                RecoveryStage::DisconnectReconnect => {
                    let _ = pool.disconnect_device(&device).await;
                    pool.connect_device(&device).await.map_err(|e| e.to_string())
                }
                RecoveryStage::RecreateProxy => {
                    pool.invalidate_proxy(&device.to_full_path());
                    pool.connect_device(&device).await.map_err(|e| e.to_string())
                }
                RecoveryStage::PowerCycleAdapter | RecoveryStage::ResetController => {
                    pool.power_cycle_adapter(&adapter).await.map_err(|e| e.to_string())?;
                    pool.connect_device(&device).await.map_err(|e| e.to_string())
                }
                RecoveryStage::RestartDaemon => {
                    Err("restarting bluetoothd is outside this crate's reach".to_string())
                }
            }
        }
    })
    .await;
    outcomes.last().map(|outcome| outcome.succeeded).unwrap_or(false)
}

fn record_read_failure(
    landmines: &mut LandmineMap,
    permissions: &mut PermissionMap,
    id: &CharacteristicId,
    err: &CoreError,
    round: u32,
) {
    let observed = classify_core_error(err);
    match observed {
        ObservedError::Timeout if round == 0 => landmines.mark(id.clone()),
        _ => {}
    }
    permissions.record(id.clone(), GattOperation::Read, observed);
}

fn classify_core_error(err: &CoreError) -> ObservedError {
    match err {
        CoreError::DbusError(dbus_err) => ObservedError::from_dbus_error_name(dbus_err.name().unwrap_or("")),
        CoreError::Reliability(_) => ObservedError::Timeout,
        CoreError::NotConnected(_) => ObservedError::NotConnected,
        _ => ObservedError::Other,
    }
}

/// Reads one characteristic `repeats` times in a row, in order, keyed just by the attempt index.
pub async fn multi_read_characteristic(
    pool: &IpcPool,
    id: &CharacteristicId,
    repeats: usize,
) -> Vec<Result<Vec<u8>, CoreError>> {
    let mut results = Vec::with_capacity(repeats);
    for _ in 0..repeats {
        results.push(pool.read_characteristic(id, 0).await);
    }
    results
}

/// Reads every characteristic in `mapping` for `rounds` rounds, in the mapping's own order.
/// Results are keyed by characteristic identifier to keep ordering deterministic regardless of
/// which reads failed along the way.
pub async fn multi_read_all(
    pool: &IpcPool,
    mapping: &GattMapping,
    rounds: usize,
) -> HashMap<CharacteristicId, Vec<Result<Vec<u8>, CoreError>>> {
    let mut results: HashMap<CharacteristicId, Vec<Result<Vec<u8>, CoreError>>> = HashMap::new();
    for characteristic in &mapping.characteristics {
        if !characteristic.flags.contains(CharacteristicFlags::READ) {
            continue;
        }
        let reads = multi_read_characteristic(pool, &characteristic.id, rounds).await;
        results.insert(characteristic.id.clone(), reads);
    }
    results
}

/// One payload's outcome from a brute-force write pass.
#[derive(Clone, Debug)]
pub struct BruteWriteOutcome {
    pub payload: Vec<u8>,
    pub result: Result<(), String>,
    pub verified_read: Option<Result<Vec<u8>, String>>,
}

/// Writes every payload in `payloads` to `id` in turn, honouring the landmine map unless `force`
/// is set, optionally reading back afterwards to verify.
pub async fn brute_write_range(
    pool: &IpcPool,
    id: &CharacteristicId,
    payloads: &[Vec<u8>],
    verify: bool,
    force: bool,
    landmines: &LandmineMap,
) -> Vec<BruteWriteOutcome> {
    if landmines.is_landmined(id) && !force {
        return vec![];
    }
    let mut outcomes = Vec::with_capacity(payloads.len());
    for payload in payloads {
        let result = pool
            .write_characteristic(id, payload.clone(), WriteOptions::default())
            .await
            .map_err(|e| e.to_string());
        let verified_read = if verify {
            Some(pool.read_characteristic(id, 0).await.map_err(|e| e.to_string()))
        } else {
            None
        };
        outcomes.push(BruteWriteOutcome { payload: payload.clone(), result, verified_read });
    }
    outcomes
}
