//! Async D-Bus bindings for the `org.bluez` and `org.bluez.obex` interfaces
//! BLEEP talks to. These are hand-authored in the shape
//! `dbus-codegen-rust --client=nonblock --methodtype=none --prop-newtype`
//! produces, rather than actually generated, so that the interfaces match
//! BLEEP's needs exactly (a subset of each real interface, plus the OBEX
//! side BlueZ's codegen templates don't usually cover).

mod adapter1;
mod agent1;
mod agentmanager1;
mod device1;
mod gattcharacteristic1;
mod gattdescriptor1;
mod gattmanager1;
mod gattservice1;
mod obex;

pub use adapter1::{OrgBluezAdapter1, OrgBluezAdapter1Properties, ORG_BLUEZ_ADAPTER1_NAME};
pub use agent1::{methods as agent1_methods, ORG_BLUEZ_AGENT1_NAME};
pub use agentmanager1::{OrgBluezAgentManager1, ORG_BLUEZ_AGENT_MANAGER1_NAME};
pub use device1::{OrgBluezDevice1, OrgBluezDevice1Properties, ORG_BLUEZ_DEVICE1_NAME};
pub use gattcharacteristic1::{
    OrgBluezGattCharacteristic1, OrgBluezGattCharacteristic1Properties,
    ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME,
};
pub use gattdescriptor1::{
    OrgBluezGattDescriptor1, OrgBluezGattDescriptor1Properties, ORG_BLUEZ_GATT_DESCRIPTOR1_NAME,
};
pub use gattmanager1::{OrgBluezGattManager1, ORG_BLUEZ_GATT_MANAGER1_NAME};
pub use gattservice1::{
    OrgBluezGattService1, OrgBluezGattService1Properties, ORG_BLUEZ_GATT_SERVICE1_NAME,
};
pub use obex::{
    obex_agent_methods, OrgBluezObexAgentManager1, OrgBluezObexClient1,
    OrgBluezObexPhonebookAccess1, OrgBluezObexTransfer1, ORG_BLUEZ_OBEX_AGENT1_NAME,
    ORG_BLUEZ_OBEX_AGENT_MANAGER1_NAME, ORG_BLUEZ_OBEX_CLIENT1_NAME,
    ORG_BLUEZ_OBEX_PHONEBOOK_ACCESS1_NAME, ORG_BLUEZ_OBEX_TRANSFER1_NAME,
};
