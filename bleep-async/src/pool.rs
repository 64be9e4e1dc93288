use std::collections::HashMap;
use std::convert::TryInto;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bleep_generated::{
    OrgBluezAdapter1, OrgBluezAdapter1Properties, OrgBluezDevice1, OrgBluezDevice1Properties,
    OrgBluezGattCharacteristic1, OrgBluezGattDescriptor1, OrgBluezGattService1,
    ORG_BLUEZ_ADAPTER1_NAME, ORG_BLUEZ_DEVICE1_NAME, ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME,
    ORG_BLUEZ_GATT_DESCRIPTOR1_NAME, ORG_BLUEZ_GATT_SERVICE1_NAME,
};
use dbus::arg::{PropMap, Variant};
use dbus::nonblock::stdintf::org_freedesktop_dbus::{Introspectable, ObjectManager, Properties};
use dbus::nonblock::{Proxy, SyncConnection};
use dbus::Path;
use dbus_tokio::connection::IOResourceError;
use futures::stream::{self, select_all, StreamExt};
use futures::{FutureExt, Stream};
use tokio::task::JoinError;
use tokio::time::timeout;
use uuid::Uuid;

use crate::adapter::AdapterInfo;
use crate::device::DeviceInfo;
use crate::error::{CoreError, SpawnError};
use crate::events::{BluetoothEvent, DeviceEvent};
use crate::gatt::{CharacteristicInfo, DescriptorInfo, ServiceInfo};
use crate::ids::{AdapterId, CharacteristicId, DescriptorId, DeviceId, ServiceId};
use crate::introspect::IntrospectParse;
use crate::messagestream::MessageStream;

const DBUS_METHOD_CALL_TIMEOUT: Duration = Duration::from_secs(30);
const SERVICE_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// The type of transport to use for a scan.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Transport {
    Auto,
    BrEdr,
    Le,
}

impl Transport {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::BrEdr => "bredr",
            Self::Le => "le",
        }
    }
}

impl Display for Transport {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discovery filter parameters. Fields left as `None` fall back to the host stack's defaults.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiscoveryFilter {
    pub service_uuids: Vec<Uuid>,
    pub rssi_threshold: Option<i16>,
    pub pathloss_threshold: Option<u16>,
    pub transport: Option<Transport>,
    pub duplicate_data: Option<bool>,
    pub discoverable: Option<bool>,
    pub pattern: Option<String>,
}

impl From<&DiscoveryFilter> for PropMap {
    fn from(filter: &DiscoveryFilter) -> PropMap {
        let mut map: PropMap = HashMap::new();
        if !filter.service_uuids.is_empty() {
            let uuids: Vec<String> = filter.service_uuids.iter().map(Uuid::to_string).collect();
            map.insert("UUIDs".to_string(), Variant(Box::new(uuids)));
        }
        if let Some(v) = filter.rssi_threshold {
            map.insert("RSSI".to_string(), Variant(Box::new(v)));
        }
        if let Some(v) = filter.pathloss_threshold {
            map.insert("Pathloss".to_string(), Variant(Box::new(v)));
        }
        if let Some(v) = filter.transport {
            map.insert("Transport".to_string(), Variant(Box::new(v.to_string())));
        }
        if let Some(v) = filter.duplicate_data {
            map.insert("DuplicateData".to_string(), Variant(Box::new(v)));
        }
        if let Some(v) = filter.discoverable {
            map.insert("Discoverable".to_string(), Variant(Box::new(v)));
        }
        if let Some(v) = &filter.pattern {
            map.insert("Pattern".to_string(), Variant(Box::new(v.to_owned())));
        }
        map
    }
}

/// One of the four scan policies a discovery pass can run under. Each one trades off duplicate
/// suppression, restart cadence and inquiry phase differently; `ScanVariant::filter_for` builds the
/// concrete [`DiscoveryFilter`] each one needs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScanVariant {
    Passive,
    Naggy,
    Pokey,
    Brute,
}

impl ScanVariant {
    pub fn forwards_duplicates(self) -> bool {
        !matches!(self, Self::Passive)
    }

    /// Whether this variant cycles discovery on/off rather than running it once for the whole
    /// scan budget.
    pub fn cycles_discovery(self) -> bool {
        matches!(self, Self::Pokey)
    }

    /// The cycle period used while `cycles_discovery` is true.
    pub fn cycle_period(self) -> Duration {
        Duration::from_secs(1)
    }

    /// Whether this variant reserves half its budget for a BR/EDR inquiry phase.
    pub fn has_inquiry_phase(self) -> bool {
        matches!(self, Self::Brute)
    }

    pub fn filter_for(self, target: Option<&str>) -> DiscoveryFilter {
        DiscoveryFilter {
            duplicate_data: Some(self.forwards_duplicates()),
            pattern: if self.cycles_discovery() {
                target.map(str::to_owned)
            } else {
                None
            },
            ..DiscoveryFilter::default()
        }
    }
}

/// The type of write operation to use for a GATT write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteType {
    WithResponse,
    WithoutResponse,
    Reliable,
}

impl WriteType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::WithResponse => "request",
            Self::WithoutResponse => "command",
            Self::Reliable => "reliable",
        }
    }
}

impl Display for WriteType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WriteOptions {
    pub offset: usize,
    pub write_type: Option<WriteType>,
}

impl From<WriteOptions> for PropMap {
    fn from(options: WriteOptions) -> PropMap {
        let mut map: PropMap = HashMap::new();
        if options.offset != 0 {
            map.insert("offset".to_string(), Variant(Box::new(options.offset as u64)));
        }
        if let Some(write_type) = options.write_type {
            map.insert("type".to_string(), Variant(Box::new(write_type.to_string())));
        }
        map
    }
}

/// Identifies one cached proxy: the D-Bus service it targets, the object path, and the
/// interface the caller is about to invoke a method on. BlueZ only ever exposes one bus name
/// (`org.bluez`) to this crate, but the key still carries it explicitly so the cache can't
/// silently conflate entries if that ever changes.
#[derive(Clone, Eq, Hash, PartialEq)]
struct ProxyKey {
    service: &'static str,
    path: String,
    interface: &'static str,
}

/// A pooled connection to the host Bluetooth stack over D-Bus. Cheaply clonable; the actual
/// connection and the proxy cache are both behind an `Arc`, so every clone shares the same
/// underlying socket, reactor task, and cached proxies. This is the single entry point the rest
/// of the engine uses to reach BlueZ.
#[derive(Clone)]
pub struct IpcPool {
    connection: Arc<SyncConnection>,
    proxies: Arc<Mutex<HashMap<ProxyKey, Proxy<'static, Arc<SyncConnection>>>>>,
}

impl Debug for IpcPool {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "IpcPool")
    }
}

impl IpcPool {
    /// Exposes the underlying system bus connection for callers (e.g. `bleep-classic`'s full SDP
    /// discovery) that need to talk to a `org.bluez` object this pool doesn't wrap itself.
    pub fn connection(&self) -> &Arc<SyncConnection> {
        &self.connection
    }

    /// Establishes a new D-Bus connection to the system bus and returns it along with the
    /// background task that drives it. If that task's future ever resolves, the connection is
    /// gone and the caller should treat it as fatal (the reliability layer's recovery pipeline is
    /// the intended response).
    pub async fn connect() -> Result<(impl Future<Output = Result<(), SpawnError>>, Self), CoreError> {
        let (dbus_resource, connection) = dbus_tokio::connection::new_system_sync()?;
        let dbus_handle = tokio::spawn(async {
            let err: IOResourceError = dbus_resource.await;
            Err(SpawnError::DbusConnectionLost(err))
        });
        let pool = IpcPool { connection, proxies: Arc::new(Mutex::new(HashMap::new())) };
        Ok((dbus_handle.map(|res| Ok(res??)), pool))
    }

    /// Scoped access to the live bus connection, validated before handing it out. A connection
    /// whose unique name has gone empty has dropped off the bus (BlueZ restarted, the system bus
    /// itself restarted, or the socket was closed from under us) and every proxy built from it
    /// would fail anyway, so this is checked once here instead of at each of the five call sites
    /// that build a proxy.
    fn with_bus(&self) -> Result<&Arc<SyncConnection>, CoreError> {
        if self.connection.unique_name().as_cstr().to_bytes().is_empty() {
            return Err(CoreError::IpcUnavailable);
        }
        Ok(&self.connection)
    }

    /// Returns the cached proxy for `(service, path, interface)`, building and inserting one on
    /// first access. Every method-trait implementation the generated bindings provide for a given
    /// object path is backed by the exact same underlying `Proxy` value, so entries only diverge
    /// in which interface they were requested under, not in what they point at.
    fn get_proxy(&self, path: &str, interface: &'static str) -> Result<Proxy<'static, Arc<SyncConnection>>, CoreError> {
        let connection = self.with_bus()?;
        let key = ProxyKey { service: "org.bluez", path: path.to_string(), interface };
        let mut proxies = self.proxies.lock().unwrap();
        if let Some(proxy) = proxies.get(&key) {
            return Ok(proxy.clone());
        }
        let proxy = Proxy::new("org.bluez", Path::new(path.to_string()).unwrap(), DBUS_METHOD_CALL_TIMEOUT, connection.clone());
        proxies.insert(key, proxy.clone());
        Ok(proxy)
    }

    /// Drops every cached proxy under `path` and its descendants (e.g. a device disconnecting
    /// invalidates its services, characteristics and descriptors too). Call this whenever BlueZ
    /// reports an object as removed from `InterfacesRemoved`, or after a reconnect makes existing
    /// proxies suspect.
    pub fn invalidate_proxy(&self, path: &str) {
        let mut proxies = self.proxies.lock().unwrap();
        proxies.retain(|key, _| key.path != path && !key.path.starts_with(&format!("{path}/")));
    }

    pub async fn get_adapters(&self) -> Result<Vec<AdapterInfo>, CoreError> {
        let tree = self.bluez_root()?.get_managed_objects().await?;
        Ok(tree
            .into_iter()
            .filter_map(|(object_path, interfaces)| {
                let props = OrgBluezAdapter1Properties::from_interfaces(&interfaces)?;
                AdapterInfo::from_properties(AdapterId::new(&object_path), props).ok()
            })
            .collect())
    }

    pub async fn get_adapter_info(&self, id: &AdapterId) -> Result<AdapterInfo, CoreError> {
        let properties = self.adapter(id)?.get_all(ORG_BLUEZ_ADAPTER1_NAME).await?;
        AdapterInfo::from_properties(id.to_owned(), OrgBluezAdapter1Properties(&properties))
    }

    pub async fn get_devices(&self) -> Result<Vec<DeviceInfo>, CoreError> {
        let tree = self.bluez_root()?.get_managed_objects().await?;
        Ok(tree
            .into_iter()
            .filter_map(|(object_path, interfaces)| {
                let props = OrgBluezDevice1Properties::from_interfaces(&interfaces)?;
                DeviceInfo::from_properties(DeviceId::new(&object_path), props).ok()
            })
            .collect())
    }

    pub async fn get_device_info(&self, id: &DeviceId) -> Result<DeviceInfo, CoreError> {
        let properties = self.device(id)?.get_all(ORG_BLUEZ_DEVICE1_NAME).await?;
        DeviceInfo::from_properties(id.to_owned(), OrgBluezDevice1Properties(&properties))
    }

    /// Starts discovery on every adapter using the filter appropriate to `variant`.
    pub async fn start_scan(
        &self,
        variant: ScanVariant,
        target: Option<&str>,
    ) -> Result<(), CoreError> {
        let filter = variant.filter_for(target);
        let adapters = self.get_adapters().await?;
        if adapters.is_empty() {
            return Err(CoreError::NoBluetoothAdapters);
        }
        for adapter in adapters {
            self.start_discovery_on_adapter_with_filter(&adapter.id, &filter)
                .await?;
        }
        Ok(())
    }

    pub async fn start_discovery_on_adapter_with_filter(
        &self,
        adapter_id: &AdapterId,
        filter: &DiscoveryFilter,
    ) -> Result<(), CoreError> {
        let adapter = self.adapter(adapter_id)?;
        adapter.set_powered(true).await?;
        adapter.set_discovery_filter(filter.into()).await?;
        adapter.start_discovery().await?;
        Ok(())
    }

    pub async fn stop_discovery_on_adapter(&self, adapter_id: &AdapterId) -> Result<(), CoreError> {
        Ok(self.adapter(adapter_id)?.stop_discovery().await?)
    }

    /// Powers `adapter_id` off and back on. The crude recovery primitive BlueZ exposes over
    /// D-Bus for "the controller has wedged" short of a full `hciconfig reset` or daemon restart.
    pub async fn power_cycle_adapter(&self, adapter_id: &AdapterId) -> Result<(), CoreError> {
        let adapter = self.adapter(adapter_id)?;
        adapter.set_powered(false).await?;
        adapter.set_powered(true).await?;
        Ok(())
    }

    pub async fn get_services(&self, device: &DeviceId) -> Result<Vec<ServiceInfo>, CoreError> {
        let device_path = path_of(device);
        let device_node = self.device(device)?.introspect_parse(&device_path).await?;
        let mut services = vec![];
        for subnode in device_node.nodes {
            let Some(name) = subnode.name.as_deref() else { continue };
            if name.starts_with("service") {
                let path = format!("{device_path}/{name}");
                let service_id = ServiceId::new(&path);
                let service = self.service(&service_id)?;
                let uuid = Uuid::parse_str(&service.uuid().await?)?;
                let primary = service.primary().await?;
                services.push(ServiceInfo { id: service_id, uuid, primary });
            }
        }
        Ok(services)
    }

    pub async fn get_characteristics(
        &self,
        service: &ServiceId,
    ) -> Result<Vec<CharacteristicInfo>, CoreError> {
        let service_path = path_of_service(service);
        let service_node = self.service(service)?.introspect_parse(&service_path).await?;
        let mut characteristics = vec![];
        for subnode in service_node.nodes {
            let Some(name) = subnode.name.as_deref() else { continue };
            if name.starts_with("char") {
                let path = format!("{service_path}/{name}");
                let characteristic_id = CharacteristicId::new(&path);
                let characteristic = self.characteristic(&characteristic_id)?;
                let uuid = Uuid::parse_str(&characteristic.uuid().await?)?;
                let flags = characteristic.flags().await?;
                characteristics.push(CharacteristicInfo {
                    id: characteristic_id,
                    uuid,
                    flags: flags.try_into()?,
                });
            }
        }
        Ok(characteristics)
    }

    pub async fn get_descriptors(
        &self,
        characteristic: &CharacteristicId,
    ) -> Result<Vec<DescriptorInfo>, CoreError> {
        let characteristic_path = path_of_characteristic(characteristic);
        let characteristic_node =
            self.characteristic(characteristic)?.introspect_parse(&characteristic_path).await?;
        let mut descriptors = vec![];
        for subnode in characteristic_node.nodes {
            let Some(name) = subnode.name.as_deref() else { continue };
            if name.starts_with("desc") {
                let path = format!("{characteristic_path}/{name}");
                let descriptor_id = DescriptorId::new(&path);
                let uuid = Uuid::parse_str(&self.descriptor(&descriptor_id)?.uuid().await?)?;
                descriptors.push(DescriptorInfo { id: descriptor_id, uuid });
            }
        }
        Ok(descriptors)
    }

    pub async fn connect_device(&self, id: &DeviceId) -> Result<(), CoreError> {
        self.device(id)?.connect().await?;
        self.await_service_discovery(id).await
    }

    pub async fn disconnect_device(&self, id: &DeviceId) -> Result<(), CoreError> {
        let result = self.device(id)?.disconnect().await;
        self.invalidate_proxy(&id.to_full_path());
        Ok(result?)
    }

    pub async fn pair_device(&self, id: &DeviceId) -> Result<(), CoreError> {
        Ok(self.device(id)?.pair().await?)
    }

    pub async fn read_characteristic(
        &self,
        id: &CharacteristicId,
        offset: usize,
    ) -> Result<Vec<u8>, CoreError> {
        Ok(self.characteristic(id)?.read_value(offset_to_propmap(offset)).await?)
    }

    pub async fn write_characteristic(
        &self,
        id: &CharacteristicId,
        value: impl Into<Vec<u8>>,
        options: WriteOptions,
    ) -> Result<(), CoreError> {
        Ok(self.characteristic(id)?.write_value(value.into(), options.into()).await?)
    }

    pub async fn start_notify(&self, id: &CharacteristicId) -> Result<(), CoreError> {
        Ok(self.characteristic(id)?.start_notify().await?)
    }

    pub async fn stop_notify(&self, id: &CharacteristicId) -> Result<(), CoreError> {
        Ok(self.characteristic(id)?.stop_notify().await?)
    }

    pub async fn event_stream(&self) -> Result<impl Stream<Item = BluetoothEvent>, CoreError> {
        self.filtered_event_stream(None::<&DeviceId>).await
    }

    pub async fn device_event_stream(
        &self,
        device: &DeviceId,
    ) -> Result<impl Stream<Item = BluetoothEvent>, CoreError> {
        self.filtered_event_stream(Some(device)).await
    }

    async fn filtered_event_stream(
        &self,
        object: Option<&(impl Into<Path<'static>> + Clone)>,
    ) -> Result<impl Stream<Item = BluetoothEvent>, CoreError> {
        let mut message_streams = vec![];
        for match_rule in BluetoothEvent::match_rules(object.cloned().map(Into::into)) {
            let msg_match = self.connection.add_match(match_rule).await?;
            message_streams.push(MessageStream::new(msg_match, self.connection.clone()));
        }
        Ok(select_all(message_streams)
            .flat_map(|message| stream::iter(BluetoothEvent::message_to_events(message))))
    }

    async fn await_service_discovery(&self, device_id: &DeviceId) -> Result<(), CoreError> {
        let mut events = Box::pin(self.device_event_stream(device_id).await?);
        if self.device(device_id)?.services_resolved().await? {
            return Ok(());
        }
        timeout(SERVICE_DISCOVERY_TIMEOUT, async {
            while let Some(event) = events.next().await {
                if matches!(
                    event,
                    BluetoothEvent::Device { id, event: DeviceEvent::ServicesResolved } if &id == device_id
                ) {
                    return Ok(());
                }
            }
            Err(CoreError::ServiceDiscoveryTimedOut)
        })
        .await
        .unwrap_or(Err(CoreError::ServiceDiscoveryTimedOut))
    }

    fn bluez_root(&self) -> Result<Proxy<'static, Arc<SyncConnection>>, CoreError> {
        self.get_proxy("/", "org.freedesktop.DBus.ObjectManager")
    }

    fn adapter(&self, id: &AdapterId) -> Result<Proxy<'static, Arc<SyncConnection>>, CoreError> {
        self.get_proxy(&id.to_full_path(), ORG_BLUEZ_ADAPTER1_NAME)
    }

    fn device(&self, id: &DeviceId) -> Result<Proxy<'static, Arc<SyncConnection>>, CoreError> {
        self.get_proxy(&id.to_full_path(), ORG_BLUEZ_DEVICE1_NAME)
    }

    fn service(&self, id: &ServiceId) -> Result<Proxy<'static, Arc<SyncConnection>>, CoreError> {
        self.get_proxy(&id.to_full_path(), ORG_BLUEZ_GATT_SERVICE1_NAME)
    }

    fn characteristic(
        &self,
        id: &CharacteristicId,
    ) -> Result<Proxy<'static, Arc<SyncConnection>>, CoreError> {
        self.get_proxy(&id.to_full_path(), ORG_BLUEZ_GATT_CHARACTERISTIC1_NAME)
    }

    fn descriptor(&self, id: &DescriptorId) -> Result<Proxy<'static, Arc<SyncConnection>>, CoreError> {
        self.get_proxy(&id.to_full_path(), ORG_BLUEZ_GATT_DESCRIPTOR1_NAME)
    }
}

fn offset_to_propmap(offset: usize) -> PropMap {
    let mut map: PropMap = HashMap::new();
    if offset != 0 {
        map.insert("offset".to_string(), Variant(Box::new(offset as u64)));
    }
    map
}

fn path_of(device: &DeviceId) -> String {
    device.to_full_path()
}

fn path_of_service(service: &ServiceId) -> String {
    service.to_full_path()
}

fn path_of_characteristic(characteristic: &CharacteristicId) -> String {
    characteristic.to_full_path()
}
