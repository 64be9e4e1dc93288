// D-Bus bindings for the org.bluez.GattService1 interface.
#[allow(unused_imports)]
use dbus::arg;
use dbus::arg::PropMap;
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;
use std::collections::HashMap;

pub const ORG_BLUEZ_GATT_SERVICE1_NAME: &str = "org.bluez.GattService1";

pub trait OrgBluezGattService1 {
    fn uuid(&self) -> nonblock::MethodReply<String>;
    fn primary(&self) -> nonblock::MethodReply<bool>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezGattService1
    for nonblock::Proxy<'a, C>
{
    fn uuid(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, ORG_BLUEZ_GATT_SERVICE1_NAME, "UUID")
    }

    fn primary(&self) -> nonblock::MethodReply<bool> {
        <Self as Properties>::get(self, ORG_BLUEZ_GATT_SERVICE1_NAME, "Primary")
    }
}

pub struct OrgBluezGattService1Properties<'a>(pub &'a PropMap);

impl<'a> OrgBluezGattService1Properties<'a> {
    pub fn from_interfaces(
        interfaces: &'a HashMap<String, PropMap>,
    ) -> Option<OrgBluezGattService1Properties<'a>> {
        interfaces
            .get(ORG_BLUEZ_GATT_SERVICE1_NAME)
            .map(OrgBluezGattService1Properties)
    }

    fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        arg::cast(&self.0.get(name)?.0)
    }

    pub fn uuid(&self) -> Option<&String> {
        self.get("UUID")
    }
    pub fn primary(&self) -> Option<bool> {
        self.get("Primary").copied()
    }
    pub fn device(&self) -> Option<&dbus::Path<'static>> {
        self.get("Device")
    }
    pub fn includes(&self) -> Option<&Vec<dbus::Path<'static>>> {
        self.get("Includes")
    }
    pub fn handle(&self) -> Option<u16> {
        self.get("Handle").copied()
    }
}
