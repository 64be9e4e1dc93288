use std::str::FromStr;

use bleep_async::{AdapterEvent, BluetoothEvent, CharacteristicEvent, DeviceEvent, GattMapping, MacAddress};
use futures::{Stream, StreamExt};

use crate::dispatcher::Router;
use crate::types::{RouterEvent, SignalType};

/// Drains `events` forever, converting each [`BluetoothEvent`] into a [`RouterEvent`] and
/// submitting it to `router`. `mapping` resolves characteristic/service UUIDs from IDs the event
/// stream only carries as D-Bus paths; pass `GattMapping::default()` if that context isn't
/// available yet, the router just sees fewer UUIDs to filter on.
pub async fn pump_into_router(
    mut events: impl Stream<Item = BluetoothEvent> + Unpin,
    router: Router,
    mapping: &GattMapping,
) {
    while let Some(event) = events.next().await {
        router.submit(to_router_event(&event, mapping));
    }
}

fn to_router_event(event: &BluetoothEvent, mapping: &GattMapping) -> RouterEvent {
    match event {
        BluetoothEvent::Adapter { id, event } => RouterEvent {
            signal_type: SignalType::PropertyChange,
            mac: None,
            service_uuid: None,
            characteristic_uuid: None,
            path: id.to_string(),
            property: Some(adapter_property_name(event).to_owned()),
            value: None,
        },
        BluetoothEvent::Device { id, event } => {
            let path = id.to_string();
            RouterEvent {
                signal_type: SignalType::PropertyChange,
                mac: mac_from_path(&path),
                service_uuid: None,
                characteristic_uuid: None,
                path,
                property: Some(device_property_name(event).to_owned()),
                value: device_event_value(event),
            }
        }
        BluetoothEvent::Characteristic { id, event } => {
            let characteristic = mapping.characteristics.iter().find(|c| &c.id == id);
            let service_uuid = characteristic
                .and_then(|c| mapping.services.iter().find(|s| s.id == c.id.service()))
                .map(|s| s.uuid.to_string());
            let CharacteristicEvent::Value(value) = event;
            let path = id.to_string();
            RouterEvent {
                signal_type: SignalType::Notification,
                mac: mac_from_path(&path),
                service_uuid,
                characteristic_uuid: characteristic.map(|c| c.uuid.to_string()),
                path,
                property: Some("Value".to_owned()),
                value: Some(value.clone()),
            }
        }
    }
}

/// Recovers the MAC address BlueZ encodes into a `dev_AA_BB_CC_DD_EE_FF` object path segment.
/// Device and characteristic object paths both carry this segment; adapter paths never do.
fn mac_from_path(path: &str) -> Option<MacAddress> {
    let segment = path.split('/').find_map(|segment| segment.strip_prefix("dev_"))?;
    MacAddress::from_str(&segment.replace('_', ":")).ok()
}

fn adapter_property_name(event: &AdapterEvent) -> &'static str {
    match event {
        AdapterEvent::Powered(_) => "Powered",
        AdapterEvent::Discovering(_) => "Discovering",
        AdapterEvent::Discoverable(_) => "Discoverable",
        AdapterEvent::Pairable(_) => "Pairable",
    }
}

fn device_property_name(event: &DeviceEvent) -> &'static str {
    match event {
        DeviceEvent::Connected(_) => "Connected",
        DeviceEvent::ServicesResolved => "ServicesResolved",
        DeviceEvent::Rssi(_) => "RSSI",
        DeviceEvent::ManufacturerData(_) => "ManufacturerData",
        DeviceEvent::ServiceData(_) => "ServiceData",
        DeviceEvent::Paired(_) => "Paired",
    }
}

fn device_event_value(event: &DeviceEvent) -> Option<Vec<u8>> {
    match event {
        DeviceEvent::Connected(v) | DeviceEvent::Paired(v) => Some(vec![*v as u8]),
        DeviceEvent::Rssi(v) => Some(v.to_be_bytes().to_vec()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bleep_async::DeviceId;

    #[test]
    fn device_event_carries_mac() {
        let id = DeviceId::new("/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF");
        let event = BluetoothEvent::Device { id, event: DeviceEvent::Connected(true) };
        let router_event = to_router_event(&event, &GattMapping::default());
        assert_eq!(router_event.mac.unwrap().to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn adapter_event_has_no_mac() {
        let id = bleep_async::AdapterId::new("/org/bluez/hci0");
        let event = BluetoothEvent::Adapter { id, event: AdapterEvent::Powered(true) };
        let router_event = to_router_event(&event, &GattMapping::default());
        assert!(router_event.mac.is_none());
    }
}
