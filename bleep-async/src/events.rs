use std::collections::HashMap;

use bleep_generated::{ORG_BLUEZ_ADAPTER1_NAME, ORG_BLUEZ_DEVICE1_NAME, ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME};
use dbus::arg::{cast, PropMap, RefArg, Variant};
use dbus::message::{MatchRule, SignalArgs};
use dbus::nonblock::stdintf::org_freedesktop_dbus::PropertiesPropertiesChanged as PropertiesChanged;
use dbus::Message;
use dbus::Path;

use crate::ids::{AdapterId, CharacteristicId, DeviceId};

/// Property-change events for an adapter.
#[derive(Clone, Debug, PartialEq)]
pub enum AdapterEvent {
    Powered(bool),
    Discovering(bool),
    Discoverable(bool),
    Pairable(bool),
}

/// Property-change events for a device. `Rssi`/`ManufacturerData`/
/// `ServiceData` typically arrive bundled together on one advertisement;
/// they're split into separate variants here so callers can match on just
/// the one they care about.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent {
    Connected(bool),
    ServicesResolved,
    Rssi(i16),
    ManufacturerData(HashMap<u16, Vec<u8>>),
    ServiceData(HashMap<String, Vec<u8>>),
    Paired(bool),
}

/// Value-change events for a characteristic (i.e. notifications).
#[derive(Clone, Debug, PartialEq)]
pub enum CharacteristicEvent {
    Value(Vec<u8>),
}

/// An event observed on the `PropertiesChanged` signal stream, attributed
/// to whichever object (adapter/device/characteristic) it came from.
#[derive(Clone, Debug, PartialEq)]
pub enum BluetoothEvent {
    Adapter {
        id: AdapterId,
        event: AdapterEvent,
    },
    Device {
        id: DeviceId,
        event: DeviceEvent,
    },
    Characteristic {
        id: CharacteristicId,
        event: CharacteristicEvent,
    },
}

impl BluetoothEvent {
    /// D-Bus match rules to subscribe to in order to observe events for
    /// `object` (or every object, if `None`).
    pub fn match_rules(object: Option<Path<'static>>) -> Vec<MatchRule<'static>> {
        let mut rule = MatchRule::new_signal("org.freedesktop.DBus.Properties", "PropertiesChanged");
        rule.path = object;
        vec![rule]
    }

    /// Converts one D-Bus message (a `PropertiesChanged` signal) into zero
    /// or more typed events.
    pub fn message_to_events(message: Message) -> Vec<BluetoothEvent> {
        let Some(path) = message.path() else {
            return vec![];
        };
        let path = path.into_static();
        let Some(changed) = PropertiesChanged::from_message(&message) else {
            return vec![];
        };

        match changed.interface_name.as_str() {
            ORG_BLUEZ_ADAPTER1_NAME => adapter_events(&path, &changed.changed_properties),
            ORG_BLUEZ_DEVICE1_NAME => device_events(&path, &changed.changed_properties),
            ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME => {
                characteristic_events(&path, &changed.changed_properties)
            }
            _ => vec![],
        }
    }
}

fn adapter_events(path: &Path<'static>, changed: &PropMap) -> Vec<BluetoothEvent> {
    let id = AdapterId::new(&path.to_string());
    let mut events = Vec::new();
    if let Some(v) = get_bool(changed, "Powered") {
        events.push(BluetoothEvent::Adapter { id: id.clone(), event: AdapterEvent::Powered(v) });
    }
    if let Some(v) = get_bool(changed, "Discovering") {
        events.push(BluetoothEvent::Adapter { id: id.clone(), event: AdapterEvent::Discovering(v) });
    }
    if let Some(v) = get_bool(changed, "Discoverable") {
        events.push(BluetoothEvent::Adapter { id: id.clone(), event: AdapterEvent::Discoverable(v) });
    }
    if let Some(v) = get_bool(changed, "Pairable") {
        events.push(BluetoothEvent::Adapter { id, event: AdapterEvent::Pairable(v) });
    }
    events
}

fn device_events(path: &Path<'static>, changed: &PropMap) -> Vec<BluetoothEvent> {
    let id = DeviceId::new(&path.to_string());
    let mut events = Vec::new();
    if let Some(v) = get_bool(changed, "Connected") {
        events.push(BluetoothEvent::Device { id: id.clone(), event: DeviceEvent::Connected(v) });
    }
    if let Some(true) = get_bool(changed, "ServicesResolved") {
        events.push(BluetoothEvent::Device { id: id.clone(), event: DeviceEvent::ServicesResolved });
    }
    if let Some(v) = get_bool(changed, "Paired") {
        events.push(BluetoothEvent::Device { id: id.clone(), event: DeviceEvent::Paired(v) });
    }
    if let Some(v) = changed.get("RSSI").and_then(|v| cast::<i16>(&v.0)) {
        events.push(BluetoothEvent::Device { id: id.clone(), event: DeviceEvent::Rssi(*v) });
    }
    if let Some(data) = changed
        .get("ManufacturerData")
        .and_then(|v| cast::<HashMap<u16, Variant<Box<dyn RefArg>>>>(&v.0))
    {
        let converted = data
            .iter()
            .filter_map(|(k, v)| cast::<Vec<u8>>(&v.0).map(|bytes| (*k, bytes.clone())))
            .collect();
        events.push(BluetoothEvent::Device { id: id.clone(), event: DeviceEvent::ManufacturerData(converted) });
    }
    if let Some(data) = changed.get("ServiceData").and_then(|v| cast::<PropMap>(&v.0)) {
        let converted = data
            .iter()
            .filter_map(|(k, v)| cast::<Vec<u8>>(&v.0).map(|bytes| (k.clone(), bytes.clone())))
            .collect();
        events.push(BluetoothEvent::Device { id, event: DeviceEvent::ServiceData(converted) });
    }
    events
}

fn characteristic_events(path: &Path<'static>, changed: &PropMap) -> Vec<BluetoothEvent> {
    let id = CharacteristicId::new(&path.to_string());
    let mut events = Vec::new();
    if let Some(value) = changed.get("Value").and_then(|v| cast::<Vec<u8>>(&v.0)) {
        events.push(BluetoothEvent::Characteristic {
            id,
            event: CharacteristicEvent::Value(value.clone()),
        });
    }
    events
}

fn get_bool(changed: &PropMap, key: &str) -> Option<bool> {
    changed.get(key).and_then(|v| cast::<bool>(&v.0)).copied()
}
