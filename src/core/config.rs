//! Configuration parsing and validation.
//!
//! Node configuration is loaded from TOML files. Sections map onto the
//! runtime's components: the node identity, placement ring geometry,
//! default replication factors, access tracking, seed membership, and
//! monitoring.

use crate::placement::{local, ring, ReplicationFactor, Tier};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// This node's identity.
    pub node: NodeConfig,

    /// Thread counts. Worker counts are cluster-wide per tier; placement
    /// assumes every node of a tier runs the same number of workers.
    #[serde(default)]
    pub threads: ThreadsConfig,

    /// Hash ring geometry.
    #[serde(default)]
    pub placement: PlacementConfig,

    /// Default replication factors for keys without explicit metadata.
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Access tracking and stats reporting.
    #[serde(default)]
    pub access: AccessConfig,

    /// Cluster membership seeds.
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Stats destination.
    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Identity of this node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Stable node identifier, unique across the cluster.
    pub id: String,

    /// Host other nodes and clients reach this node at.
    #[serde(default = "default_host")]
    pub host: String,

    /// Storage tier: "memory" or "disk".
    #[serde(default = "default_tier")]
    pub tier: String,
}

/// Thread counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadsConfig {
    /// Worker threads per memory tier node.
    #[serde(default = "default_worker_threads")]
    pub memory: u32,

    /// Worker threads per disk tier node.
    #[serde(default = "default_worker_threads")]
    pub disk: u32,

    /// Router threads on this node. Zero disables routing here.
    #[serde(default = "default_routing_threads")]
    pub routing: u32,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            memory: default_worker_threads(),
            disk: default_worker_threads(),
            routing: default_routing_threads(),
        }
    }
}

/// Hash ring geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Virtual points per node on the cross-node rings.
    #[serde(default = "default_virtual_nodes")]
    pub virtual_nodes: usize,

    /// Virtual points per thread on the local assignment rings.
    #[serde(default = "default_virtual_threads")]
    pub virtual_threads: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            virtual_nodes: default_virtual_nodes(),
            virtual_threads: default_virtual_threads(),
        }
    }
}

/// Default replication factors applied to keys without explicit metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Memory tier replica count.
    #[serde(default = "default_memory_replication")]
    pub memory: u32,

    /// Disk tier replica count.
    #[serde(default = "default_disk_replication")]
    pub disk: u32,

    /// Owning threads per replica node.
    #[serde(default = "default_local_replication")]
    pub local: u32,

    /// How often workers push their changeset to peer replicas.
    #[serde(default = "default_propagate_interval_ms")]
    pub propagate_interval_ms: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            memory: default_memory_replication(),
            disk: default_disk_replication(),
            local: default_local_replication(),
            propagate_interval_ms: default_propagate_interval_ms(),
        }
    }
}

/// Access tracking and stats reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Lookback window covered by each stats report. Records older than
    /// this are evicted.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// How often workers report access stats.
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            report_interval_ms: default_report_interval_ms(),
        }
    }
}

/// Cluster membership seeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Nodes joined to the rings at startup, in addition to this node.
    #[serde(default)]
    pub seeds: Vec<SeedNode>,
}

/// A node known at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedNode {
    pub id: String,
    pub host: String,

    /// Storage tier: "memory" or "disk".
    #[serde(default = "default_tier")]
    pub tier: String,
}

/// Stats destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Address stats reports are sent to. Absent disables reporting.
    #[serde(default)]
    pub stats_address: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error". The
    /// RUST_LOG environment variable takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_tier() -> String {
    Tier::Memory.name().to_string()
}

fn default_worker_threads() -> u32 {
    4
}

fn default_routing_threads() -> u32 {
    1
}

fn default_virtual_nodes() -> usize {
    ring::DEFAULT_VIRTUAL_NODES
}

fn default_virtual_threads() -> usize {
    local::DEFAULT_VIRTUAL_THREADS
}

fn default_memory_replication() -> u32 {
    1
}

fn default_disk_replication() -> u32 {
    0
}

fn default_local_replication() -> u32 {
    1
}

fn default_propagate_interval_ms() -> u64 {
    100
}

fn default_window_ms() -> u64 {
    30_000
}

fn default_report_interval_ms() -> u64 {
    15_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_node()?;
        self.validate_placement()?;
        self.validate_replication()?;
        self.validate_access()?;
        self.validate_cluster()?;
        self.validate_telemetry()?;
        Ok(())
    }

    /// This node's storage tier.
    pub fn node_tier(&self) -> Result<Tier> {
        parse_tier("node.tier", &self.node.tier)
    }

    /// Worker threads per node of `tier`.
    pub fn worker_threads(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Memory => self.threads.memory,
            Tier::Disk => self.threads.disk,
        }
    }

    /// The replication factor applied to keys without explicit metadata.
    pub fn default_replication_factor(&self) -> ReplicationFactor {
        let mut factor = ReplicationFactor::with_global(&[
            (Tier::Memory, self.replication.memory),
            (Tier::Disk, self.replication.disk),
        ]);
        for tier in Tier::ALL {
            factor.set_local(tier, self.replication.local);
        }
        factor
    }

    fn validate_node(&self) -> Result<()> {
        if self.node.id.is_empty() {
            anyhow::bail!("node.id must not be empty");
        }
        if self.node.host.is_empty() {
            anyhow::bail!("node.host must not be empty");
        }
        parse_tier("node.tier", &self.node.tier)?;
        if self.threads.memory == 0 {
            anyhow::bail!("threads.memory must be > 0");
        }
        if self.threads.disk == 0 {
            anyhow::bail!("threads.disk must be > 0");
        }
        Ok(())
    }

    fn validate_placement(&self) -> Result<()> {
        if self.placement.virtual_nodes == 0 {
            anyhow::bail!("placement.virtual_nodes must be > 0");
        }
        if self.placement.virtual_threads == 0 {
            anyhow::bail!("placement.virtual_threads must be > 0");
        }
        Ok(())
    }

    fn validate_replication(&self) -> Result<()> {
        if self.replication.memory == 0 && self.replication.disk == 0 {
            anyhow::bail!("replication must place keys on at least one tier");
        }
        if self.replication.local == 0 {
            anyhow::bail!("replication.local must be > 0");
        }
        if self.replication.propagate_interval_ms == 0 {
            anyhow::bail!("replication.propagate_interval_ms must be > 0");
        }
        Ok(())
    }

    fn validate_access(&self) -> Result<()> {
        if self.access.window_ms == 0 {
            anyhow::bail!("access.window_ms must be > 0");
        }
        if self.access.report_interval_ms == 0 {
            anyhow::bail!("access.report_interval_ms must be > 0");
        }
        Ok(())
    }

    fn validate_cluster(&self) -> Result<()> {
        for seed in &self.cluster.seeds {
            if seed.id.is_empty() {
                anyhow::bail!("cluster.seeds entries need a non-empty id");
            }
            if seed.host.is_empty() {
                anyhow::bail!("cluster.seeds entry '{}' needs a host", seed.id);
            }
            parse_tier("cluster.seeds.tier", &seed.tier)?;
            if seed.id == self.node.id {
                anyhow::bail!("cluster.seeds must not list this node ('{}')", seed.id);
            }
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }
}

impl SeedNode {
    /// This seed's storage tier.
    pub fn tier(&self) -> Result<Tier> {
        parse_tier("cluster.seeds.tier", &self.tier)
    }
}

fn parse_tier(field: &str, value: &str) -> Result<Tier> {
    Tier::parse(value)
        .with_context(|| format!("{field} must be 'memory' or 'disk', got: {value}"))
}
