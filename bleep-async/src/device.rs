use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use bleep_generated::OrgBluezDevice1Properties;
use dbus::arg::{cast, PropMap, RefArg, Variant};
use uuid::Uuid;

use crate::error::CoreError;
use crate::ids::DeviceId;
use crate::macaddress::MacAddress;

/// MAC address type of a Bluetooth device.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AddressType {
    Public,
    Random,
}

impl AddressType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Random => "random",
        }
    }
}

impl Display for AddressType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "random" => Ok(Self::Random),
            _ => Err(CoreError::AddressTypeParseError(s.to_owned())),
        }
    }
}

/// The lifecycle state of a discovered device, tracked independently of
/// whatever BlueZ's own `Connected`/`ServicesResolved` properties say so
/// that a stalled transition (e.g. a device that never resolves services)
/// can be detected and recovered from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceLifecycle {
    New,
    Connecting,
    Connected,
    ServicesResolving,
    ServicesResolved,
    Enumerating,
    Idle,
    Disconnecting,
}

impl DeviceLifecycle {
    /// Whether `next` is a legal transition from `self`, per the device
    /// lifecycle state machine.
    pub fn can_transition_to(self, next: DeviceLifecycle) -> bool {
        use DeviceLifecycle::*;
        matches!(
            (self, next),
            (New, Connecting)
                | (Connecting, Connected)
                | (Connecting, New)
                | (Connected, ServicesResolving)
                | (ServicesResolving, ServicesResolved)
                | (ServicesResolved, Enumerating)
                | (ServicesResolved, Idle)
                | (Enumerating, Idle)
                | (Idle, Enumerating)
                | (Idle, Disconnecting)
                | (Enumerating, Disconnecting)
                | (Disconnecting, New)
        )
    }
}

/// Information about a Bluetooth device which was discovered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub mac_address: MacAddress,
    pub address_type: AddressType,
    pub name: Option<String>,
    pub appearance: Option<u16>,
    pub services: Vec<Uuid>,
    pub paired: bool,
    pub connected: bool,
    pub rssi: Option<i16>,
    pub tx_power: Option<i16>,
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    pub service_data: HashMap<Uuid, Vec<u8>>,
    pub services_resolved: bool,
}

impl DeviceInfo {
    pub(crate) fn from_properties(
        id: DeviceId,
        device_properties: OrgBluezDevice1Properties,
    ) -> Result<DeviceInfo, CoreError> {
        let mac_address = device_properties
            .address()
            .ok_or(CoreError::RequiredPropertyMissing("Address"))?
            .parse()?;
        let address_type = device_properties
            .address_type()
            .ok_or(CoreError::RequiredPropertyMissing("AddressType"))?
            .parse()?;
        let services = get_services(device_properties);
        let manufacturer_data = get_manufacturer_data(device_properties).unwrap_or_default();
        let service_data = get_service_data(device_properties).unwrap_or_default();

        Ok(DeviceInfo {
            id,
            mac_address,
            address_type,
            name: device_properties.name().cloned(),
            appearance: device_properties.appearance(),
            services,
            paired: device_properties
                .paired()
                .ok_or(CoreError::RequiredPropertyMissing("Paired"))?,
            connected: device_properties
                .connected()
                .ok_or(CoreError::RequiredPropertyMissing("Connected"))?,
            rssi: device_properties.rssi(),
            tx_power: device_properties.tx_power(),
            manufacturer_data,
            service_data,
            services_resolved: device_properties
                .services_resolved()
                .ok_or(CoreError::RequiredPropertyMissing("ServicesResolved"))?,
        })
    }
}

fn get_manufacturer_data(device_properties: OrgBluezDevice1Properties) -> Option<HashMap<u16, Vec<u8>>> {
    Some(convert_manufacturer_data(device_properties.manufacturer_data()?))
}

pub(crate) fn convert_manufacturer_data(
    data: &HashMap<u16, Variant<Box<dyn RefArg>>>,
) -> HashMap<u16, Vec<u8>> {
    data.iter()
        .filter_map(|(&k, v)| {
            if let Some(v) = cast::<Vec<u8>>(&v.0) {
                Some((k, v.to_owned()))
            } else {
                log::warn!("manufacturer data for id {:04x} had wrong type", k);
                None
            }
        })
        .collect()
}

fn get_service_data(device_properties: OrgBluezDevice1Properties) -> Option<HashMap<Uuid, Vec<u8>>> {
    Some(convert_service_data(device_properties.service_data()?))
}

pub(crate) fn convert_service_data(data: &PropMap) -> HashMap<Uuid, Vec<u8>> {
    data.iter()
        .filter_map(|(k, v)| match Uuid::parse_str(k) {
            Ok(uuid) => cast::<Vec<u8>>(&v.0).map(|v| (uuid, v.to_owned())),
            Err(err) => {
                log::warn!("error parsing service data uuid: {}", err);
                None
            }
        })
        .collect()
}

fn get_services(device_properties: OrgBluezDevice1Properties) -> Vec<Uuid> {
    device_properties
        .uuids()
        .map(|uuids| convert_services(uuids))
        .unwrap_or_default()
}

pub(crate) fn convert_services(uuids: &[String]) -> Vec<Uuid> {
    uuids
        .iter()
        .filter_map(|uuid| {
            Uuid::parse_str(uuid)
                .map_err(|err| log::warn!("error parsing service uuid {}: {}", uuid, err))
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bleuuid::uuid_from_u32;

    #[test]
    fn device_info_minimal() {
        let id = DeviceId::new("/org/bluez/hci0/dev_11_22_33_44_55_66");
        let mut device_properties: HashMap<String, Variant<Box<dyn RefArg>>> = HashMap::new();
        device_properties.insert(
            "Address".to_string(),
            Variant(Box::new("00:11:22:33:44:55".to_string())),
        );
        device_properties.insert(
            "AddressType".to_string(),
            Variant(Box::new("public".to_string())),
        );
        device_properties.insert("Paired".to_string(), Variant(Box::new(false)));
        device_properties.insert("Connected".to_string(), Variant(Box::new(false)));
        device_properties.insert("ServicesResolved".to_string(), Variant(Box::new(false)));

        let device =
            DeviceInfo::from_properties(id.clone(), OrgBluezDevice1Properties(&device_properties))
                .unwrap();
        assert_eq!(device.mac_address.to_string(), "00:11:22:33:44:55");
        assert_eq!(device.address_type, AddressType::Public);
        assert!(!device.services_resolved);
    }

    #[test]
    fn get_services_some() {
        let uuid = uuid_from_u32(0x1122_3344);
        let uuids = vec![uuid.to_string()];
        let mut device_properties: HashMap<String, Variant<Box<dyn RefArg>>> = HashMap::new();
        device_properties.insert("UUIDs".to_string(), Variant(Box::new(uuids)));
        assert_eq!(
            get_services(OrgBluezDevice1Properties(&device_properties)),
            vec![uuid]
        );
    }

    #[test]
    fn address_type_parse_roundtrip() {
        for address_type in [AddressType::Public, AddressType::Random] {
            assert_eq!(
                address_type.to_string().parse::<AddressType>().unwrap(),
                address_type
            );
        }
    }

    #[test]
    fn lifecycle_rejects_illegal_jump() {
        assert!(!DeviceLifecycle::New.can_transition_to(DeviceLifecycle::ServicesResolved));
        assert!(DeviceLifecycle::New.can_transition_to(DeviceLifecycle::Connecting));
    }
}
