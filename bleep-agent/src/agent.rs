use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use bleep_generated::{agent1_methods as agent_methods, OrgBluezAgentManager1, ORG_BLUEZ_AGENT1_NAME};
use dbus::channel::MatchingReceiver;
use dbus::message::MatchRule;
use dbus::nonblock::SyncConnection;
use dbus_crossroads::{Crossroads, IfaceBuilder, IfaceToken};
use log::{error, info};
use tokio::sync::mpsc;

use bleep_reliability::HealthEvent;

use crate::bond::{BondRecord, BondStore};
use crate::capability::Capability;
use crate::error::AgentError;
use crate::io::IoHandler;
use crate::state::{PairingState, SessionTracker};

const AGENT_PATH: &str = "/bleep/pairing_agent";

/// BLEEP's own `org.bluez.Agent1` object: every request is logged, routed
/// through the pairing state machine, and handed to the configured
/// [`IoHandler`]. On `Complete` the pairing is persisted through the
/// configured [`BondStore`].
pub struct PairingAgent {
    capability: Capability,
    io: Arc<dyn IoHandler>,
    bonds: Arc<dyn BondStore>,
    sessions: SessionTracker,
}

impl PairingAgent {
    pub fn new(capability: Capability, io: Arc<dyn IoHandler>, bonds: Arc<dyn BondStore>) -> Arc<Self> {
        let bonds_for_callback = bonds.clone();
        let capability_for_callback = capability;
        let on_terminal = Arc::new(move |device: &str, state: PairingState| {
            if state == PairingState::Complete {
                let bonded_at_unix = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
                let record = BondRecord::new(device, capability_for_callback, bonded_at_unix);
                if let Err(err) = bonds_for_callback.store(&record) {
                    error!("failed to persist bond for {device}: {err}");
                }
            }
        });
        Arc::new(Self { capability, io, bonds, sessions: SessionTracker::new(Some(on_terminal)) })
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn bonds(&self) -> &dyn BondStore {
        self.bonds.as_ref()
    }

    fn register_interface(cr: &mut Crossroads) -> IfaceToken<Arc<Self>> {
        cr.register(ORG_BLUEZ_AGENT1_NAME, |ib: &mut IfaceBuilder<Arc<Self>>| {
            ib.method(agent_methods::RELEASE, (), (), move |_ctx, _agent, (): ()| {
                info!("pairing agent released by the host stack");
                Ok(())
            });

            ib.method(
                agent_methods::REQUEST_PIN_CODE,
                ("device",),
                ("pincode",),
                move |_ctx, agent, (device,): (dbus::Path<'static>,)| {
                    let device = device.to_string();
                    info!("RequestPinCode({device})");
                    agent.sessions.advance(&device, PairingState::Requested)?;
                    agent.sessions.advance(&device, PairingState::WaitingForInput)?;
                    let pin = agent.io.request_pin_code(&device)?;
                    Ok((pin,))
                },
            );

            ib.method(
                agent_methods::DISPLAY_PIN_CODE,
                ("device", "pincode"),
                (),
                move |_ctx, agent, (device, pincode): (dbus::Path<'static>, String)| {
                    let device = device.to_string();
                    info!("DisplayPinCode({device}, {pincode})");
                    agent.io.display_pin_code(&device, &pincode);
                    Ok(())
                },
            );

            ib.method(
                agent_methods::REQUEST_PASSKEY,
                ("device",),
                ("passkey",),
                move |_ctx, agent, (device,): (dbus::Path<'static>,)| {
                    let device = device.to_string();
                    info!("RequestPasskey({device})");
                    agent.sessions.advance(&device, PairingState::Requested)?;
                    agent.sessions.advance(&device, PairingState::WaitingForInput)?;
                    let passkey = agent.io.request_passkey(&device)?;
                    Ok((passkey,))
                },
            );

            ib.method(
                agent_methods::DISPLAY_PASSKEY,
                ("device", "passkey", "entered"),
                (),
                move |_ctx, agent, (device, passkey, entered): (dbus::Path<'static>, u32, u16)| {
                    let device = device.to_string();
                    info!("DisplayPasskey({device}, {passkey:06}, {entered})");
                    agent.io.display_passkey(&device, passkey, entered);
                    Ok(())
                },
            );

            ib.method(
                agent_methods::REQUEST_CONFIRMATION,
                ("device", "passkey"),
                (),
                move |_ctx, agent, (device, passkey): (dbus::Path<'static>, u32)| {
                    let device = device.to_string();
                    info!("RequestConfirmation({device}, {passkey:06})");
                    agent.sessions.advance(&device, PairingState::Requested)?;
                    agent.sessions.advance(&device, PairingState::Confirming)?;
                    if agent.io.request_confirmation(&device, passkey)? {
                        agent.sessions.advance(&device, PairingState::Bonding)?;
                        agent.sessions.advance(&device, PairingState::Complete)?;
                        Ok(())
                    } else {
                        agent.sessions.advance(&device, PairingState::Failed)?;
                        Err(AgentError::Rejected(device).into())
                    }
                },
            );

            ib.method(
                agent_methods::REQUEST_AUTHORIZATION,
                ("device",),
                (),
                move |_ctx, agent, (device,): (dbus::Path<'static>,)| {
                    let device = device.to_string();
                    info!("RequestAuthorization({device})");
                    agent.sessions.advance(&device, PairingState::Requested)?;
                    if agent.io.request_authorization(&device)? {
                        agent.sessions.advance(&device, PairingState::Bonding)?;
                        agent.sessions.advance(&device, PairingState::Complete)?;
                        Ok(())
                    } else {
                        agent.sessions.advance(&device, PairingState::Failed)?;
                        Err(AgentError::Rejected(device).into())
                    }
                },
            );

            ib.method(
                agent_methods::AUTHORIZE_SERVICE,
                ("device", "uuid"),
                (),
                move |_ctx, agent, (device, uuid): (dbus::Path<'static>, String)| {
                    let device = device.to_string();
                    info!("AuthorizeService({device}, {uuid})");
                    if agent.io.authorize_service(&device, &uuid)? {
                        Ok(())
                    } else {
                        Err(AgentError::Rejected(device).into())
                    }
                },
            );

            ib.method(agent_methods::CANCEL, (), (), move |_ctx, agent, (): ()| {
                info!("pairing cancelled by the host stack");
                // Cancel can arrive for any in-flight device; since crossroads doesn't pass us
                // the device on Cancel, sessions are left to time out naturally rather than
                // guessing which one to mark cancelled.
                let _ = &agent.sessions;
                Ok(())
            });
        })
    }

    /// Registers the agent object on `connection`, wires incoming method calls into it, and
    /// tells BlueZ to use it with this agent's capability profile.
    pub async fn register(self: &Arc<Self>, connection: &Arc<SyncConnection>) -> Result<(), AgentError> {
        let mut cr = Crossroads::new();
        let token = Self::register_interface(&mut cr);
        let path = dbus::Path::new(AGENT_PATH).expect("static path is valid");
        cr.insert(path.clone(), &[token], self.clone());

        let cr = Arc::new(Mutex::new(cr));
        connection.start_receive(
            MatchRule::new_method_call(),
            Box::new(move |msg, conn| cr.lock().expect("crossroads mutex poisoned").handle_message(msg, conn).is_ok()),
        );

        let proxy =
            dbus::nonblock::Proxy::new("org.bluez", "/org/bluez", std::time::Duration::from_secs(10), connection.as_ref());
        proxy.register_agent(path, self.capability.as_str()).await?;
        Ok(())
    }
}

/// Watches `health_events` and re-registers `agent` on `connection` whenever BlueZ's
/// availability flips back to up, so a BlueZ restart doesn't leave pairing unattended.
pub async fn reregister_on_restart(
    agent: Arc<PairingAgent>,
    connection: Arc<SyncConnection>,
    mut health_events: mpsc::Receiver<HealthEvent>,
) {
    while let Some(event) = health_events.recv().await {
        if matches!(event, HealthEvent::AvailabilityChanged { available: true } | HealthEvent::Recovered { .. }) {
            info!("bluetoothd back up, re-registering pairing agent");
            if let Err(err) = agent.register(&connection).await {
                error!("failed to re-register pairing agent: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::FilesystemBondStore;
    use crate::io::AutoAccept;

    #[test]
    fn construction_does_not_panic() {
        let dir = std::env::temp_dir().join(format!("bleep-agent-construct-{}", std::process::id()));
        let agent = PairingAgent::new(
            Capability::DisplayYesNo,
            Arc::new(AutoAccept::default()),
            Arc::new(FilesystemBondStore::new(&dir)),
        );
        assert_eq!(agent.capability(), Capability::DisplayYesNo);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
