// D-Bus bindings for the org.bluez.Device1 interface, hand-authored in the
// style `dbus-codegen-rust --client=nonblock --methodtype=none --prop-newtype`
// would produce, see https://github.com/diwic/dbus-rs
#[allow(unused_imports)]
use dbus::arg;
use dbus::arg::{PropMap, Variant, RefArg};
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;
use std::collections::HashMap;

pub const ORG_BLUEZ_DEVICE1_NAME: &str = "org.bluez.Device1";

pub trait OrgBluezDevice1 {
    fn connect(&self) -> nonblock::MethodReply<()>;
    fn disconnect(&self) -> nonblock::MethodReply<()>;
    fn connect_profile(&self, uuid: &str) -> nonblock::MethodReply<()>;
    fn disconnect_profile(&self, uuid: &str) -> nonblock::MethodReply<()>;
    fn pair(&self) -> nonblock::MethodReply<()>;
    fn cancel_pairing(&self) -> nonblock::MethodReply<()>;
    fn get_service_records(&self) -> nonblock::MethodReply<Vec<Vec<u8>>>;
    fn services_resolved(&self) -> nonblock::MethodReply<bool>;
    fn connected(&self) -> nonblock::MethodReply<bool>;
    fn address(&self) -> nonblock::MethodReply<String>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezDevice1
    for nonblock::Proxy<'a, C>
{
    fn connect(&self) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_DEVICE1_NAME, "Connect", ())
    }

    fn disconnect(&self) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_DEVICE1_NAME, "Disconnect", ())
    }

    fn connect_profile(&self, uuid: &str) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_DEVICE1_NAME, "ConnectProfile", (uuid,))
    }

    fn disconnect_profile(&self, uuid: &str) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_DEVICE1_NAME, "DisconnectProfile", (uuid,))
    }

    fn pair(&self) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_DEVICE1_NAME, "Pair", ())
    }

    fn cancel_pairing(&self) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_DEVICE1_NAME, "CancelPairing", ())
    }

    /// Not all BlueZ versions expose this the same way; some report records via
    /// `ServiceDiscovery` plumbing instead. Treated as best-effort by callers.
    fn get_service_records(&self) -> nonblock::MethodReply<Vec<Vec<u8>>> {
        self.method_call(ORG_BLUEZ_DEVICE1_NAME, "GetServiceRecords", ())
    }

    fn services_resolved(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, ORG_BLUEZ_DEVICE1_NAME, "ServicesResolved")
    }

    fn connected(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, ORG_BLUEZ_DEVICE1_NAME, "Connected")
    }

    fn address(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, ORG_BLUEZ_DEVICE1_NAME, "Address")
    }
}

/// Typed view over the `org.bluez.Device1` property map.
pub struct OrgBluezDevice1Properties<'a>(pub &'a PropMap);

impl<'a> OrgBluezDevice1Properties<'a> {
    pub fn from_interfaces(
        interfaces: &'a HashMap<String, PropMap>,
    ) -> Option<OrgBluezDevice1Properties<'a>> {
        interfaces
            .get(ORG_BLUEZ_DEVICE1_NAME)
            .map(OrgBluezDevice1Properties)
    }

    fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        arg::cast(&self.0.get(name)?.0)
    }

    pub fn address(&self) -> Option<&String> {
        self.get("Address")
    }
    pub fn address_type(&self) -> Option<&String> {
        self.get("AddressType")
    }
    pub fn name(&self) -> Option<&String> {
        self.get("Name")
    }
    pub fn alias(&self) -> Option<&String> {
        self.get("Alias")
    }
    pub fn class(&self) -> Option<u32> {
        self.get("Class").copied()
    }
    pub fn appearance(&self) -> Option<u16> {
        self.get("Appearance").copied()
    }
    pub fn icon(&self) -> Option<&String> {
        self.get("Icon")
    }
    pub fn paired(&self) -> Option<bool> {
        self.get("Paired").copied()
    }
    pub fn trusted(&self) -> Option<bool> {
        self.get("Trusted").copied()
    }
    pub fn blocked(&self) -> Option<bool> {
        self.get("Blocked").copied()
    }
    pub fn connected(&self) -> Option<bool> {
        self.get("Connected").copied()
    }
    pub fn uuids(&self) -> Option<&Vec<String>> {
        self.get("UUIDs")
    }
    pub fn modalias(&self) -> Option<&String> {
        self.get("Modalias")
    }
    pub fn rssi(&self) -> Option<i16> {
        self.get("RSSI").copied()
    }
    pub fn tx_power(&self) -> Option<i16> {
        self.get("TxPower").copied()
    }
    pub fn manufacturer_data(&self) -> Option<&HashMap<u16, Variant<Box<dyn RefArg>>>> {
        self.get("ManufacturerData")
    }
    pub fn service_data(&self) -> Option<&PropMap> {
        self.get("ServiceData")
    }
    pub fn advertising_data(&self) -> Option<&HashMap<u8, Variant<Box<dyn RefArg>>>> {
        self.get("AdvertisingData")
    }
    pub fn services_resolved(&self) -> Option<bool> {
        self.get("ServicesResolved").copied()
    }
    pub fn adapter(&self) -> Option<&dbus::Path<'static>> {
        self.get("Adapter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbus::arg::Variant;

    #[test]
    fn missing_property_is_none() {
        let map: PropMap = HashMap::new();
        let props = OrgBluezDevice1Properties(&map);
        assert_eq!(props.address(), None);
        assert_eq!(props.connected(), None);
    }

    #[test]
    fn reads_scalar_properties() {
        let mut map: PropMap = HashMap::new();
        map.insert(
            "Address".to_string(),
            Variant(Box::new("aa:bb:cc:dd:ee:ff".to_string())),
        );
        map.insert("Connected".to_string(), Variant(Box::new(true)));
        let props = OrgBluezDevice1Properties(&map);
        assert_eq!(props.address().unwrap(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(props.connected(), Some(true));
    }
}
