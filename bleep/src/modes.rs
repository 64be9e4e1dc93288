use std::time::{Duration, Instant};

use bleep_async::{
    connect_and_enumerate, AddressType as AsyncAddressType, CharacteristicFlags, DeviceInfo,
    DiscoveryFilter, EnumerationVariant, GattOperation, ObservedError, ScanVariant, Transport,
};
use bleep_store::{AddressType as StoreAddressType, DeviceAttrs, GattCharacteristicInput, GattServiceInput};
use log::info;

use crate::context::Context;
use crate::error::CoreError;

/// Runs one scan pass under `variant` for `timeout`, persisting every device BlueZ reports
/// afterwards. `target` narrows discovery to devices matching that pattern. Some variants
/// cycle start/stop discovery repeatedly, since BlueZ only flushes its advertisement cache
/// on `StopDiscovery`.
pub async fn scan(ctx: &Context, variant: ScanVariant, timeout: Duration, target: Option<&str>) -> Result<Vec<DeviceInfo>, CoreError> {
    let adapters = ctx.pool.get_adapters().await?;
    let adapter = adapters.first().ok_or(CoreError::NoAdapter)?;
    let filter = variant.filter_for(target);

    let deadline = Instant::now() + timeout;
    if variant.cycles_discovery() {
        let mut cycles = 0u32;
        while Instant::now() < deadline {
            ctx.pool.start_discovery_on_adapter_with_filter(&adapter.id, &filter).await?;
            tokio::time::sleep(variant.cycle_period().min(deadline.saturating_duration_since(Instant::now()))).await;
            ctx.pool.stop_discovery_on_adapter(&adapter.id).await?;
            cycles += 1;
        }
        info!("pokey scan ran {cycles} discovery start/stop cycle(s)");
    } else {
        ctx.pool.start_discovery_on_adapter_with_filter(&adapter.id, &filter).await?;
        tokio::time::sleep(timeout).await;
        ctx.pool.stop_discovery_on_adapter(&adapter.id).await?;
    }

    let devices = ctx.pool.get_devices().await?;
    for device in &devices {
        persist_device(ctx, device)?;
    }
    Ok(devices)
}

/// Passive discovery: one continuous discovery window, duplicates suppressed, no enumeration.
pub async fn passive(ctx: &Context, timeout: Duration) -> Result<Vec<DeviceInfo>, CoreError> {
    scan(ctx, ScanVariant::Passive, timeout, None).await
}

/// Naggy: duplicates forwarded, connect and walk GATT with retries, no write probing.
pub async fn naggy(ctx: &Context, timeout: Duration, target: &str) -> Result<Vec<DeviceInfo>, CoreError> {
    let devices = scan(ctx, ScanVariant::Naggy, timeout, Some(target)).await?;
    enumerate_target(ctx, &devices, target, EnumerationVariant::Naggy).await?;
    Ok(devices)
}

/// Pokey: cycles discovery on/off to force repeated advertisement-cache flushes, targeted at
/// one address, and probes writable characteristics during enumeration.
pub async fn pokey(ctx: &Context, timeout: Duration, target: &str) -> Result<Vec<DeviceInfo>, CoreError> {
    let devices = scan(ctx, ScanVariant::Pokey, timeout, Some(target)).await?;
    enumerate_target(ctx, &devices, target, EnumerationVariant::Pokey).await?;
    Ok(devices)
}

/// Brute: reserves half the budget for a BR/EDR inquiry phase in addition to LE scanning, then
/// enumerates with every read/write probe this build supports.
pub async fn brute(ctx: &Context, timeout: Duration, target: &str) -> Result<Vec<DeviceInfo>, CoreError> {
    let adapters = ctx.pool.get_adapters().await?;
    let adapter = adapters.first().ok_or(CoreError::NoAdapter)?;

    let half = timeout / 2;
    let inquiry_filter = DiscoveryFilter {
        transport: Some(Transport::BrEdr),
        ..ScanVariant::Brute.filter_for(Some(target))
    };
    info!("brute scan entering BR/EDR inquiry phase for {half:?}");
    ctx.pool.start_discovery_on_adapter_with_filter(&adapter.id, &inquiry_filter).await?;
    tokio::time::sleep(half).await;
    ctx.pool.stop_discovery_on_adapter(&adapter.id).await?;

    let inquiry_devices = ctx.pool.get_devices().await?;
    for device in &inquiry_devices {
        persist_device(ctx, device)?;
    }

    let le_devices = scan(ctx, ScanVariant::Brute, timeout - half, Some(target)).await?;

    let mut devices = inquiry_devices;
    for device in le_devices {
        if !devices.iter().any(|existing| existing.mac_address == device.mac_address) {
            devices.push(device);
        }
    }
    enumerate_target(ctx, &devices, target, EnumerationVariant::Brute).await?;
    Ok(devices)
}

/// Finds the device among `devices` matching `target`'s address and runs one connect-and-walk
/// enumeration pass over it, persisting the discovered GATT shape. A scan's discovery filter
/// only narrows what BlueZ advertises during discovery; `get_devices` still returns every device
/// the adapter currently knows about, so the match against `target` has to happen here.
async fn enumerate_target(
    ctx: &Context,
    devices: &[DeviceInfo],
    target: &str,
    variant: EnumerationVariant,
) -> Result<(), CoreError> {
    let Ok(target_mac) = target.parse::<bleep_async::MacAddress>() else {
        return Ok(());
    };
    let Some(device) = devices.iter().find(|d| d.mac_address == target_mac) else {
        info!("enumeration target {target} was not among the devices discovered this pass");
        return Ok(());
    };

    info!("connecting to {target} to enumerate GATT ({variant:?})");
    let (_, result) = connect_and_enumerate(&ctx.pool, &device.id, variant).await?;
    persist_enumeration(ctx, &device.mac_address.to_string(), &result.mapping, &result.permissions)?;
    if !result.landmines.is_empty() {
        info!("{} characteristic(s) landmined on {target}", result.landmines.len());
    }
    Ok(())
}

fn persist_enumeration(
    ctx: &Context,
    mac: &str,
    mapping: &bleep_async::GattMapping,
    permissions: &bleep_async::PermissionMap,
) -> Result<(), CoreError> {
    let service_inputs: Vec<GattServiceInput> = mapping
        .services
        .iter()
        .map(|service| GattServiceInput {
            uuid: service.uuid.to_string(),
            handle_start: None,
            handle_end: None,
            name: None,
        })
        .collect();
    let service_db_ids = ctx.store.upsert_services(mac, &service_inputs)?;

    for (service, service_db_id) in mapping.services.iter().zip(service_db_ids) {
        let characteristic_inputs: Vec<GattCharacteristicInput> = mapping
            .characteristics_of(&service.id)
            .map(|characteristic| GattCharacteristicInput {
                uuid: characteristic.uuid.to_string(),
                handle: None,
                flags: flags_to_strings(characteristic.flags),
                permission_map: permission_map_json(permissions, &characteristic.id),
            })
            .collect();
        if !characteristic_inputs.is_empty() {
            ctx.store.upsert_characteristics(service_db_id, &characteristic_inputs)?;
        }
    }
    Ok(())
}

fn flags_to_strings(flags: CharacteristicFlags) -> Vec<String> {
    let labels = [
        (CharacteristicFlags::BROADCAST, "broadcast"),
        (CharacteristicFlags::READ, "read"),
        (CharacteristicFlags::WRITE_WITHOUT_RESPONSE, "write-without-response"),
        (CharacteristicFlags::WRITE, "write"),
        (CharacteristicFlags::NOTIFY, "notify"),
        (CharacteristicFlags::INDICATE, "indicate"),
        (CharacteristicFlags::SIGNED_WRITE, "authenticated-signed-write"),
        (CharacteristicFlags::EXTENDED_PROPERTIES, "extended-properties"),
        (CharacteristicFlags::RELIABLE_WRITE, "reliable-write"),
        (CharacteristicFlags::WRITABLE_AUXILIARIES, "writable-auxiliaries"),
        (CharacteristicFlags::ENCRYPT_READ, "encrypt-read"),
        (CharacteristicFlags::ENCRYPT_WRITE, "encrypt-write"),
        (CharacteristicFlags::ENCRYPT_AUTHENTICATED_READ, "encrypt-authenticated-read"),
        (CharacteristicFlags::ENCRYPT_AUTHENTICATED_WRITE, "encrypt-authenticated-write"),
        (CharacteristicFlags::AUTHORIZE, "authorize"),
    ];
    labels
        .into_iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, name)| name.to_string())
        .collect()
}

fn permission_map_json(
    permissions: &bleep_async::PermissionMap,
    id: &bleep_async::CharacteristicId,
) -> Option<serde_json::Value> {
    let mut map = serde_json::Map::new();
    for (operation, key) in [(GattOperation::Read, "read"), (GattOperation::Write, "write")] {
        if let Some(observed) = permissions.get(id, operation) {
            map.insert(key.to_string(), serde_json::Value::String(observed_error_str(observed).to_string()));
        }
    }
    if map.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(map))
    }
}

fn observed_error_str(observed: ObservedError) -> &'static str {
    match observed {
        ObservedError::NotAuthorized => "not-authorized",
        ObservedError::NotPermitted => "not-permitted",
        ObservedError::NotSupported => "not-supported",
        ObservedError::InvalidArgs => "invalid-args",
        ObservedError::Timeout => "timeout",
        ObservedError::NotConnected => "not-connected",
        ObservedError::Other => "other",
    }
}

fn persist_device(ctx: &Context, device: &DeviceInfo) -> Result<(), CoreError> {
    let address_type = match device.address_type {
        AsyncAddressType::Public => StoreAddressType::Public,
        AsyncAddressType::Random => StoreAddressType::Random,
    };
    let attrs = DeviceAttrs {
        address_type: Some(address_type),
        name: device.name.clone(),
        appearance: device.appearance.map(u32::from),
        rssi: device.rssi,
        ..DeviceAttrs::default()
    };
    ctx.store.upsert_device(&device.mac_address.to_string(), &attrs)?;
    Ok(())
}
