// D-Bus bindings for the org.bluez.GattDescriptor1 interface.
#[allow(unused_imports)]
use dbus::arg;
use dbus::arg::PropMap;
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;
use std::collections::HashMap;

pub const ORG_BLUEZ_GATT_DESCRIPTOR1_NAME: &str = "org.bluez.GattDescriptor1";

pub trait OrgBluezGattDescriptor1 {
    fn read_value(&self, options: PropMap) -> nonblock::MethodReply<Vec<u8>>;
    fn write_value(&self, value: Vec<u8>, options: PropMap) -> nonblock::MethodReply<()>;
    fn uuid(&self) -> nonblock::MethodReply<String>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezGattDescriptor1
    for nonblock::Proxy<'a, C>
{
    fn read_value(&self, options: PropMap) -> nonblock::MethodReply<Vec<u8>> {
        self.method_call(ORG_BLUEZ_GATT_DESCRIPTOR1_NAME, "ReadValue", (options,))
    }

    fn write_value(&self, value: Vec<u8>, options: PropMap) -> nonblock::MethodReply<()> {
        self.method_call(
            ORG_BLUEZ_GATT_DESCRIPTOR1_NAME,
            "WriteValue",
            (value, options),
        )
    }

    fn uuid(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, ORG_BLUEZ_GATT_DESCRIPTOR1_NAME, "UUID")
    }
}

pub struct OrgBluezGattDescriptor1Properties<'a>(pub &'a PropMap);

impl<'a> OrgBluezGattDescriptor1Properties<'a> {
    pub fn from_interfaces(
        interfaces: &'a HashMap<String, PropMap>,
    ) -> Option<OrgBluezGattDescriptor1Properties<'a>> {
        interfaces
            .get(ORG_BLUEZ_GATT_DESCRIPTOR1_NAME)
            .map(OrgBluezGattDescriptor1Properties)
    }

    fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        arg::cast(&self.0.get(name)?.0)
    }

    pub fn uuid(&self) -> Option<&String> {
        self.get("UUID")
    }
    pub fn value(&self) -> Option<&Vec<u8>> {
        self.get("Value")
    }
}
