use std::sync::{Arc, Mutex};

use bleep_generated::{obex_agent_methods, OrgBluezObexAgentManager1, ORG_BLUEZ_OBEX_AGENT1_NAME};
use dbus::channel::MatchingReceiver;
use dbus::message::MatchRule;
use dbus::nonblock::SyncConnection;
use dbus_crossroads::{Crossroads, IfaceBuilder, IfaceToken};
use log::info;

use crate::error::ClassicError;

/// An in-process `org.bluez.obex.Agent1` object that auto-accepts transfer authorization prompts,
/// so unattended PBAP pulls don't hang waiting on a human. Registered once per process; obexd
/// calls back into it over the session bus.
pub struct ObexAgent;

const AGENT_PATH: &str = "/bleep/obex_agent";

impl ObexAgent {
    fn register_interface(cr: &mut Crossroads) -> IfaceToken<Arc<Self>> {
        cr.register(ORG_BLUEZ_OBEX_AGENT1_NAME, |ib: &mut IfaceBuilder<Arc<Self>>| {
            ib.method(obex_agent_methods::RELEASE, (), (), move |_ctx, _agent, (): ()| {
                info!("obex agent released");
                Ok(())
            });

            ib.method(
                obex_agent_methods::AUTHORIZE,
                ("transfer",),
                ("path",),
                move |_ctx, _agent, (transfer,): (dbus::Path<'static>,)| {
                    info!("auto-authorizing obex transfer {transfer}");
                    Ok((transfer,))
                },
            );

            ib.method(obex_agent_methods::CANCEL, (), (), move |_ctx, _agent, (): ()| {
                info!("obex transfer cancelled");
                Ok(())
            });
        })
    }

    /// Registers the agent object on `connection`, wires the session bus to dispatch incoming
    /// method calls into it, and tells obexd to use it as the default.
    pub async fn register(connection: &Arc<SyncConnection>) -> Result<(), ClassicError> {
        let mut cr = Crossroads::new();
        let token = Self::register_interface(&mut cr);
        let path = dbus::Path::new(AGENT_PATH).expect("static path is valid");
        cr.insert(path.clone(), &[token], Arc::new(Self));

        let cr = Arc::new(Mutex::new(cr));
        connection.start_receive(
            MatchRule::new_method_call(),
            Box::new(move |msg, conn| {
                cr.lock().expect("crossroads mutex poisoned").handle_message(msg, conn).is_ok()
            }),
        );

        let proxy = dbus::nonblock::Proxy::new(
            "org.bluez.obex",
            "/org/bluez/obex",
            std::time::Duration::from_secs(10),
            connection.as_ref(),
        );
        proxy.register_agent(path).await?;
        Ok(())
    }
}
