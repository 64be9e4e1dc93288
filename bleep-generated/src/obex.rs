// D-Bus bindings for the org.bluez.obex interfaces exposed by obexd:
// Client1 (session creation), PhonebookAccess1 (PBAP), Transfer1 (progress
// polling), and AgentManager1/Agent1 (auth prompts for transfers).
#[allow(unused_imports)]
use dbus::arg;
use dbus::arg::PropMap;
use dbus::nonblock;
use dbus::nonblock::stdintf::org_freedesktop_dbus::Properties;
use std::collections::HashMap;

pub const ORG_BLUEZ_OBEX_CLIENT1_NAME: &str = "org.bluez.obex.Client1";
pub const ORG_BLUEZ_OBEX_PHONEBOOK_ACCESS1_NAME: &str = "org.bluez.obex.PhonebookAccess1";
pub const ORG_BLUEZ_OBEX_TRANSFER1_NAME: &str = "org.bluez.obex.Transfer1";
pub const ORG_BLUEZ_OBEX_AGENT_MANAGER1_NAME: &str = "org.bluez.obex.AgentManager1";
pub const ORG_BLUEZ_OBEX_AGENT1_NAME: &str = "org.bluez.obex.Agent1";

pub trait OrgBluezObexClient1 {
    fn create_session(
        &self,
        destination: &str,
        args: PropMap,
    ) -> nonblock::MethodReply<dbus::Path<'static>>;
    fn remove_session(&self, session: dbus::Path) -> nonblock::MethodReply<()>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezObexClient1
    for nonblock::Proxy<'a, C>
{
    fn create_session(
        &self,
        destination: &str,
        args: PropMap,
    ) -> nonblock::MethodReply<dbus::Path<'static>> {
        self.method_call(
            ORG_BLUEZ_OBEX_CLIENT1_NAME,
            "CreateSession",
            (destination, args),
        )
    }

    fn remove_session(&self, session: dbus::Path) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_OBEX_CLIENT1_NAME, "RemoveSession", (session,))
    }
}

pub trait OrgBluezObexPhonebookAccess1 {
    fn select(&self, location: &str, phonebook: &str) -> nonblock::MethodReply<()>;
    fn pull_all(
        &self,
        target_file: &str,
        filters: PropMap,
    ) -> nonblock::MethodReply<(dbus::Path<'static>, PropMap)>;
    fn list(&self, filters: PropMap) -> nonblock::MethodReply<Vec<(String, PropMap)>>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>>
    OrgBluezObexPhonebookAccess1 for nonblock::Proxy<'a, C>
{
    fn select(&self, location: &str, phonebook: &str) -> nonblock::MethodReply<()> {
        self.method_call(
            ORG_BLUEZ_OBEX_PHONEBOOK_ACCESS1_NAME,
            "Select",
            (location, phonebook),
        )
    }

    fn pull_all(
        &self,
        target_file: &str,
        filters: PropMap,
    ) -> nonblock::MethodReply<(dbus::Path<'static>, PropMap)> {
        self.method_call(
            ORG_BLUEZ_OBEX_PHONEBOOK_ACCESS1_NAME,
            "PullAll",
            (target_file, filters),
        )
    }

    fn list(&self, filters: PropMap) -> nonblock::MethodReply<Vec<(String, PropMap)>> {
        self.method_call(ORG_BLUEZ_OBEX_PHONEBOOK_ACCESS1_NAME, "List", (filters,))
    }
}

pub trait OrgBluezObexTransfer1 {
    fn cancel(&self) -> nonblock::MethodReply<()>;
    fn status(&self) -> nonblock::MethodReply<String>;
    fn transferred(&self) -> nonblock::MethodReply<u64>;
    fn name(&self) -> nonblock::MethodReply<String>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezObexTransfer1
    for nonblock::Proxy<'a, C>
{
    fn cancel(&self) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_OBEX_TRANSFER1_NAME, "Cancel", ())
    }

    fn status(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, ORG_BLUEZ_OBEX_TRANSFER1_NAME, "Status")
    }

    fn transferred(&self) -> nonblock::MethodReply<u64> {
        <Self as Properties>::get(self, ORG_BLUEZ_OBEX_TRANSFER1_NAME, "Transferred")
    }

    fn name(&self) -> nonblock::MethodReply<String> {
        <Self as Properties>::get(self, ORG_BLUEZ_OBEX_TRANSFER1_NAME, "Name")
    }
}

pub trait OrgBluezObexAgentManager1 {
    fn register_agent(&self, agent: dbus::Path) -> nonblock::MethodReply<()>;
    fn unregister_agent(&self, agent: dbus::Path) -> nonblock::MethodReply<()>;
}

impl<'a, T: nonblock::NonblockReply, C: ::std::ops::Deref<Target = T>> OrgBluezObexAgentManager1
    for nonblock::Proxy<'a, C>
{
    fn register_agent(&self, agent: dbus::Path) -> nonblock::MethodReply<()> {
        self.method_call(ORG_BLUEZ_OBEX_AGENT_MANAGER1_NAME, "RegisterAgent", (agent,))
    }

    fn unregister_agent(&self, agent: dbus::Path) -> nonblock::MethodReply<()> {
        self.method_call(
            ORG_BLUEZ_OBEX_AGENT_MANAGER1_NAME,
            "UnregisterAgent",
            (agent,),
        )
    }
}

pub mod obex_agent_methods {
    pub const RELEASE: &str = "Release";
    pub const AUTHORIZE: &str = "Authorize";
    pub const CANCEL: &str = "Cancel";
}
