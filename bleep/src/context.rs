use std::sync::Arc;
use std::time::Duration;

use bleep_agent::{reregister_on_restart, AutoAccept, Capability, FilesystemBondStore, PairingAgent};
use bleep_async::IpcPool;
use bleep_reliability::{HealthMonitor, MetricsRegistry};
use bleep_router::{default_routes, Router};
use bleep_store::Store;
use log::info;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::CoreError;

/// How often the background health monitor pings the adapter to detect a `bluetoothd` restart.
const HEALTH_HEARTBEAT: Duration = Duration::from_secs(30);

/// Everything an orchestrator needs for one run: the IPC pool, the shared metrics registry,
/// the observation store, the signal router and the pairing agent, plus the resolved config
/// root. Build one, borrow `&Context` from every orchestrator, and let `Drop` release the
/// pool when the run ends.
pub struct Context {
    pub config: Config,
    pub pool: IpcPool,
    pub metrics: Arc<MetricsRegistry>,
    pub store: Arc<Store>,
    pub router: Router,
    pub agent: Arc<PairingAgent>,
    _connection_task: tokio::task::JoinHandle<()>,
    _health_task: tokio::task::JoinHandle<()>,
    _reregister_task: tokio::task::JoinHandle<()>,
}

impl Context {
    pub async fn build(config: Config, capability: Capability) -> Result<Self, CoreError> {
        std::fs::create_dir_all(&config.config_root)?;

        let (connection_future, pool) = IpcPool::connect().await?;
        let connection_task = tokio::spawn(async move {
            if let Err(err) = connection_future.await {
                log::error!("D-Bus connection task exited: {err}");
            }
        });

        let metrics = Arc::new(MetricsRegistry::new());
        let store = Arc::new(Store::open(&config.db_path)?);
        let router = Router::spawn(default_routes(), Some(store.clone()));

        let bonds = Arc::new(FilesystemBondStore::new(config.bonds_dir.clone()));
        let agent = PairingAgent::new(capability, Arc::new(AutoAccept::default()), bonds);
        agent.register(pool.connection()).await?;

        let (health_tx, health_rx) = mpsc::channel(32);
        let health_pool = pool.clone();
        let health_task = tokio::spawn(async move {
            HealthMonitor::new(HEALTH_HEARTBEAT)
                .run(
                    move || {
                        let pool = health_pool.clone();
                        async move { pool.get_adapters().await.map(|_| ()).map_err(|err| err.to_string()) }
                    },
                    health_tx,
                )
                .await;
        });
        let reregister_task = tokio::spawn(reregister_on_restart(agent.clone(), pool.connection().clone(), health_rx));

        Ok(Self {
            config,
            pool,
            metrics,
            store,
            router,
            agent,
            _connection_task: connection_task,
            _health_task: health_task,
            _reregister_task: reregister_task,
        })
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        info!("releasing BLEEP context, disconnecting D-Bus IPC pool");
        self._connection_task.abort();
        self._health_task.abort();
        self._reregister_task.abort();
    }
}
