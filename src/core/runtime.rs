//! Runtime orchestration.
//!
//! The runtime owns what every task shares: the transport, the topology
//! lock, and the lattice registry. `start` joins the configured
//! membership and spawns one task per worker and router thread; `stop`
//! signals shutdown and joins them.

use crate::core::config::Config;
use crate::lattice::registry::LatticeRegistry;
use crate::net::ChannelTransport;
use crate::placement::{NodeInfo, RouterThread, SharedTopology, Tier, Topology};
use crate::protocol::Address;
use crate::router::{run_router, RouterState};
use crate::worker::{run_worker, WorkerSchedule, WorkerState};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A running node: worker and router tasks over shared cluster state.
pub struct Runtime {
    /// Configuration.
    config: Arc<Config>,

    /// In-process message transport shared by all tasks.
    transport: Arc<ChannelTransport>,

    /// Cluster placement state.
    topology: SharedTopology,

    /// Lattice merge codecs, shared read-only.
    registry: Arc<LatticeRegistry>,

    /// Whether the runtime is running.
    running: Arc<AtomicBool>,

    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,

    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,

    /// Spawned worker and router tasks.
    tasks: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Create a new runtime with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let topology = Topology::with_geometry(
            config.threads.memory,
            config.threads.disk,
            config.placement.virtual_nodes,
            config.placement.virtual_threads,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            transport: Arc::new(ChannelTransport::new()),
            topology: topology.shared(),
            registry: Arc::new(LatticeRegistry::standard()),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the shared transport, for wiring clients in-process.
    pub fn transport(&self) -> Arc<ChannelTransport> {
        self.transport.clone()
    }

    /// Get the shared topology.
    pub fn topology(&self) -> SharedTopology {
        self.topology.clone()
    }

    /// Check if the runtime is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Get a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Join the configured membership and spawn all tasks.
    ///
    /// Order:
    /// 1. Ring membership (this node plus seeds)
    /// 2. Worker tasks
    /// 3. Router tasks
    pub async fn start(&mut self) -> Result<()> {
        let tier = self.config.node_tier()?;
        tracing::info!(
            node = %self.config.node.id,
            host = %self.config.node.host,
            %tier,
            "starting strata runtime"
        );

        self.join_membership(tier)?;
        self.spawn_workers(tier);
        self.spawn_routers();

        self.running.store(true, Ordering::Release);
        tracing::info!("strata runtime started");
        Ok(())
    }

    fn join_membership(&mut self, tier: Tier) -> Result<()> {
        let mut topo = self.topology.write();
        topo.join(
            tier,
            NodeInfo::new(&self.config.node.id, &self.config.node.host),
        );
        for seed in &self.config.cluster.seeds {
            if !topo.join(seed.tier()?, NodeInfo::new(&seed.id, &seed.host)) {
                tracing::warn!(seed = %seed.id, "duplicate seed ignored");
            }
        }
        tracing::info!(nodes = topo.total_nodes(), "membership joined");
        Ok(())
    }

    fn spawn_workers(&mut self, tier: Tier) {
        let node = NodeInfo::new(&self.config.node.id, &self.config.node.host);
        let workers = self.config.worker_threads(tier);
        let schedule = WorkerSchedule {
            propagate_interval: Duration::from_millis(
                self.config.replication.propagate_interval_ms,
            ),
            report_interval: Duration::from_millis(self.config.access.report_interval_ms),
            report_window_ms: self.config.access.window_ms,
            monitoring: self
                .config
                .monitoring
                .stats_address
                .as_deref()
                .map(Address::from),
        };
        for thread in 0..workers {
            let state = WorkerState::new(
                node.worker(thread),
                self.config.default_replication_factor(),
            );
            self.tasks.push(tokio::spawn(run_worker(
                state,
                self.topology.clone(),
                self.registry.clone(),
                self.transport.clone(),
                schedule.clone(),
                self.shutdown_rx.clone(),
            )));
        }
        tracing::info!(count = workers, "worker tasks spawned");
    }

    fn spawn_routers(&mut self) {
        let routers = self.config.threads.routing;
        for thread in 0..routers {
            let state = RouterState::new(RouterThread::new(&self.config.node.host, thread));
            self.tasks.push(tokio::spawn(run_router(
                state,
                self.topology.clone(),
                self.transport.clone(),
                self.shutdown_rx.clone(),
            )));
        }
        if routers > 0 {
            tracing::info!(count = routers, "router tasks spawned");
        }
    }

    /// Trigger graceful shutdown.
    pub fn shutdown(&self) {
        tracing::info!("shutdown requested");
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for shutdown signal.
    pub async fn wait_for_shutdown(&mut self) {
        let mut rx = self.shutdown_rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Run the runtime until shutdown.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;

        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("shutdown signal received (SIGINT)");
            }
            _ = async {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            } => {
                tracing::info!("shutdown requested by component");
            }
        }

        self.stop().await
    }

    /// Stop all tasks and wait for them to drain.
    pub async fn stop(&mut self) -> Result<()> {
        tracing::info!("stopping strata runtime");
        self.running.store(false, Ordering::Release);
        let _ = self.shutdown_tx.send(true);

        for handle in self.tasks.drain(..) {
            match tokio::time::timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(error = %err, "task panicked"),
                Err(_) => tracing::warn!("task stop timed out"),
            }
        }

        tracing::info!("strata runtime stopped");
        Ok(())
    }
}
