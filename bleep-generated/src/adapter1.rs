// D-Bus bindings for the org.bluez.Adapter1 interface, hand-authored in the
// style `dbus-codegen-rust --client=nonblock --methodtype=none --prop-newtype`
// would produce, see https://github.com/diwic/dbus-rs
#[allow(unused_imports)]
use dbus::arg;
use dbus::arg::PropMap;
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;
use std::collections::HashMap;

pub const ORG_BLUEZ_ADAPTER1_NAME: &str = "org.bluez.Adapter1";

pub trait OrgBluezAdapter1 {
    fn start_discovery(&self) -> nonblock::MethodReply<()>;
    fn stop_discovery(&self) -> nonblock::MethodReply<()>;
    fn remove_device(&self, device: dbus::Path) -> nonblock::MethodReply<()>;
    fn set_discovery_filter(&self, properties: PropMap) -> nonblock::MethodReply<()>;
    fn get_discovery_filters(&self) -> nonblock::MethodReply<Vec<String>>;
    fn powered(&self) -> nonblock::MethodReply<bool>;
    fn set_powered(&self, value: bool) -> nonblock::MethodReply<()>;
    fn discoverable(&self) -> nonblock::MethodReply<bool>;
    fn set_discoverable(&self, value: bool) -> nonblock::MethodReply<()>;
    fn pairable(&self) -> nonblock::MethodReply<bool>;
    fn set_pairable(&self, value: bool) -> nonblock::MethodReply<()>;
    fn discovering(&self) -> nonblock::MethodReply<bool>;
    fn address(&self) -> nonblock::MethodReply<String>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezAdapter1
    for nonblock::Proxy<'a, C>
{
    fn start_discovery(&self) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_ADAPTER1_NAME, "StartDiscovery", ())
    }

    fn stop_discovery(&self) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_ADAPTER1_NAME, "StopDiscovery", ())
    }

    fn remove_device(&self, device: dbus::Path) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_ADAPTER1_NAME, "RemoveDevice", (device,))
    }

    fn set_discovery_filter(&self, properties: PropMap) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_ADAPTER1_NAME, "SetDiscoveryFilter", (properties,))
    }

    fn get_discovery_filters(&self) -> nonblock::MethodReply<Vec<String>> {
        self.method_call(ORG_BLUEZ_ADAPTER1_NAME, "GetDiscoveryFilters", ())
    }

    fn powered(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, ORG_BLUEZ_ADAPTER1_NAME, "Powered")
    }

    fn set_powered(&self, value: bool) -> nonblock::MethodReply<()> {
        <Self as Properties>::set(self, ORG_BLUEZ_ADAPTER1_NAME, "Powered", value)
    }

    fn discoverable(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, ORG_BLUEZ_ADAPTER1_NAME, "Discoverable")
    }

    fn set_discoverable(&self, value: bool) -> nonblock::MethodReply<()> {
        <Self as Properties>::set(self, ORG_BLUEZ_ADAPTER1_NAME, "Discoverable", value)
    }

    fn pairable(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, ORG_BLUEZ_ADAPTER1_NAME, "Pairable")
    }

    fn set_pairable(&self, value: bool) -> nonblock::MethodReply<()> {
        <Self as Properties>::set(self, ORG_BLUEZ_ADAPTER1_NAME, "Pairable", value)
    }

    fn discovering(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, ORG_BLUEZ_ADAPTER1_NAME, "Discovering")
    }

    fn address(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, ORG_BLUEZ_ADAPTER1_NAME, "Address")
    }
}

/// Typed view over the `org.bluez.Adapter1` property map, as returned by
/// `GetManagedObjects` or `Properties.GetAll`.
pub struct OrgBluezAdapter1Properties<'a>(pub &'a PropMap);

impl<'a> OrgBluezAdapter1Properties<'a> {
    pub fn from_interfaces(
        interfaces: &'a HashMap<String, PropMap>,
    ) -> Option<OrgBluezAdapter1Properties<'a>> {
        interfaces
            .get(ORG_BLUEZ_ADAPTER1_NAME)
            .map(OrgBluezAdapter1Properties)
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
    pub fn powered(&self) -> Option<bool> {
        self.get("Powered").copied()
    }
    pub fn discoverable(&self) -> Option<bool> {
        self.get("Discoverable").copied()
    }
    pub fn pairable(&self) -> Option<bool> {
        self.get("Pairable").copied()
    }
    pub fn discovering(&self) -> Option<bool> {
        self.get("Discovering").copied()
    }
    pub fn uuids(&self) -> Option<&Vec<String>> {
        self.get("UUIDs")
    }
    pub fn class(&self) -> Option<u32> {
        self.get("Class").copied()
    }
}
