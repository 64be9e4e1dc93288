// D-Bus bindings for the org.bluez.GattCharacteristic1 interface.
#[allow(unused_imports)]
use dbus::arg;
use dbus::arg::PropMap;
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;
use std::collections::HashMap;

pub const ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME: &str = "org.bluez.GattCharacteristic1";

pub trait OrgBluezGattCharacteristic1 {
    fn read_value(&self, options: PropMap) -> nonblock::MethodReply<Vec<u8>>;
    fn write_value(&self, value: Vec<u8>, options: PropMap) -> nonblock::MethodReply<()>;
    fn start_notify(&self) -> nonblock::MethodReply<()>;
    fn stop_notify(&self) -> nonblock::MethodReply<()>;
    fn confirm(&self) -> nonblock::MethodReply<()>;
    fn uuid(&self) -> nonblock::MethodReply<String>;
    fn flags(&self) -> nonblock::MethodReply<Vec<String>>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezGattCharacteristic1
    for nonblock::Proxy<'a, C>
{
    fn read_value(&self, options: PropMap) -> nonblock::MethodReply<Vec<u8>> {
        self.method_call(ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME, "ReadValue", (options,))
    }

    fn write_value(&self, value: Vec<u8>, options: PropMap) -> nonblock::MethodReply<()> {
        self.method_call(
            ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME,
            "WriteValue",
            (value, options),
        )
    }

    fn start_notify(&self) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME, "StartNotify", ())
    }

    fn stop_notify(&self) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME, "StopNotify", ())
    }

    fn confirm(&self) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME, "Confirm", ())
    }

    fn uuid(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME, "UUID")
    }

    fn flags(&self) -> nonblock::MethodReply<Vec<String>> {
        <Self as Properties>::get(self, ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME, "Flags")
    }
}

pub struct OrgBluezGattCharacteristic1Properties<'a>(pub &'a PropMap);

impl<'a> OrgBluezGattCharacteristic1Properties<'a> {
    pub fn from_interfaces(
        interfaces: &'a HashMap<String, PropMap>,
    ) -> Option<OrgBluezGattCharacteristic1Properties<'a>> {
        interfaces
            .get(ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME)
            .map(OrgBluezGattCharacteristic1Properties)
    }

    fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        arg::cast(&self.0.get(name)?.0)
    }

    pub fn uuid(&self) -> Option<&String> {
        self.get("UUID")
    }
    pub fn service(&self) -> Option<&dbus::Path<'static>> {
        self.get("Service")
    }
    pub fn value(&self) -> Option<&Vec<u8>> {
        self.get("Value")
    }
    pub fn notifying(&self) -> Option<bool> {
        self.get("Notifying").copied()
    }
    pub fn flags(&self) -> Option<&Vec<String>> {
        self.get("Flags")
    }
    pub fn handle(&self) -> Option<u16> {
        self.get("Handle").copied()
    }
}
