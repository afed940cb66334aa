use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_NODE_COUNT: usize = 3;
const DEFAULT_CONTAINER_PREFIX: &str = "fl-";
const DEFAULT_IMAGE: &str = "forklab/bitcoind:latest";
const DEFAULT_NETWORK_NAME: &str = "forklab_isolated";
// RFC6890 future-use range; never collides with the address ranges the node
// software itself reserves.
const DEFAULT_SUBNET: &str = "240.0.0.0/4";
const DEFAULT_BOOTSTRAP_IP: &str = "240.0.0.2";
const DEFAULT_SEED_IP: &str = "240.0.0.3";
const DEFAULT_LATENCY_MS: u64 = 100;
const DEFAULT_BLOCK_SLOTS: usize = 4;
const DEFAULT_BLOCK_ACTIONS: usize = 130;
const DEFAULT_TX_SLOTS: usize = 60;
const DEFAULT_TX_ACTIONS: usize = 10;
const DEFAULT_TX_AMOUNT: &str = "10.0";
// One coinbase per node plus this catch-up crosses the maturity threshold,
// making the warm-up rewards spendable.
const DEFAULT_WARMUP_CHAIN_DEPTH: u32 = 100;
const DEFAULT_NETWORK_SETTLE_SECS: u64 = 1;
const DEFAULT_STARTUP_SETTLE_SECS: u64 = 2;
const DEFAULT_WARMUP_SETTLE_SECS: u64 = 10;
const DEFAULT_SPREAD_SETTLE_SECS: u64 = 10;

/// Runtime configuration for one orchestrated run.
///
/// All instances must be constructed via [`RunConfig::builder`] so invariants
/// are validated before any command is rendered or issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    node_count: usize,
    container_prefix: String,
    image: String,
    network_name: String,
    subnet: String,
    bootstrap_ip: String,
    seed_ip: String,
    latency: Option<Duration>,
    block_slots: usize,
    block_actions: usize,
    blocks_per_action: u32,
    tx_slots: usize,
    tx_actions: usize,
    tx_amount: String,
    warmup_chain_depth: u32,
    network_settle: Duration,
    startup_settle: Duration,
    warmup_settle: Duration,
    spread_settle: Duration,
    data_root: PathBuf,
    run_tag: String,
    rng_seed: Option<u64>,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn container_prefix(&self) -> &str {
        &self.container_prefix
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn subnet(&self) -> &str {
        &self.subnet
    }

    pub fn bootstrap_ip(&self) -> &str {
        &self.bootstrap_ip
    }

    pub fn seed_ip(&self) -> &str {
        &self.seed_ip
    }

    /// Artificial per-container egress delay; `None` disables injection.
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    /// Number of scheduling slots the block actions spread over.
    pub fn block_slots(&self) -> usize {
        self.block_slots
    }

    /// Number of block-generation actions scheduled for the run.
    pub fn block_actions(&self) -> usize {
        self.block_actions
    }

    pub fn blocks_per_action(&self) -> u32 {
        self.blocks_per_action
    }

    pub fn tx_slots(&self) -> usize {
        self.tx_slots
    }

    pub fn tx_actions(&self) -> usize {
        self.tx_actions
    }

    pub fn tx_amount(&self) -> &str {
        &self.tx_amount
    }

    pub fn warmup_chain_depth(&self) -> u32 {
        self.warmup_chain_depth
    }

    pub fn network_settle(&self) -> Duration {
        self.network_settle
    }

    pub fn startup_settle(&self) -> Duration {
        self.startup_settle
    }

    pub fn warmup_settle(&self) -> Duration {
        self.warmup_settle
    }

    /// Wait after the scheduled load so blocks finish spreading before
    /// chain-tip reads.
    pub fn spread_settle(&self) -> Duration {
        self.spread_settle
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Tag column appended to every artifact row.
    pub fn run_tag(&self) -> &str {
        &self.run_tag
    }

    /// Seed for the run's RNG; `None` draws from entropy.
    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_count == 0 {
            bail!("node_count must be greater than 0");
        }
        ensure_shell_safe(&self.container_prefix, "container_prefix")?;
        ensure_shell_safe(&self.image, "image")?;
        ensure_shell_safe(&self.network_name, "network_name")?;
        ensure_shell_safe(&self.subnet, "subnet")?;
        ensure_shell_safe(&self.bootstrap_ip, "bootstrap_ip")?;
        ensure_shell_safe(&self.seed_ip, "seed_ip")?;

        if self.blocks_per_action == 0 {
            bail!("blocks_per_action must be greater than 0");
        }
        if self.warmup_chain_depth == 0 {
            bail!("warmup_chain_depth must be greater than 0");
        }

        let amount: f64 = self
            .tx_amount
            .parse()
            .with_context(|| format!("tx_amount {:?} is not a number", self.tx_amount))?;
        if amount <= 0.0 {
            bail!("tx_amount must be greater than 0");
        }

        if self.run_tag.trim().is_empty() {
            bail!("run_tag cannot be empty");
        }
        if self.run_tag.contains(';') || self.run_tag.contains('\n') {
            bail!("run_tag cannot contain delimiters or newlines");
        }
        if self.data_root.as_os_str().is_empty() {
            bail!("data_root cannot be empty");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct RunConfigBuilder {
    node_count: Option<usize>,
    container_prefix: Option<String>,
    image: Option<String>,
    network_name: Option<String>,
    subnet: Option<String>,
    bootstrap_ip: Option<String>,
    seed_ip: Option<String>,
    latency: Option<Option<Duration>>,
    block_slots: Option<usize>,
    block_actions: Option<usize>,
    blocks_per_action: Option<u32>,
    tx_slots: Option<usize>,
    tx_actions: Option<usize>,
    tx_amount: Option<String>,
    warmup_chain_depth: Option<u32>,
    network_settle: Option<Duration>,
    startup_settle: Option<Duration>,
    warmup_settle: Option<Duration>,
    spread_settle: Option<Duration>,
    data_root: Option<PathBuf>,
    run_tag: Option<String>,
    rng_seed: Option<u64>,
}

impl RunConfigBuilder {
    pub fn node_count(mut self, count: usize) -> Self {
        self.node_count = Some(count);
        self
    }

    pub fn container_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.container_prefix = Some(prefix.into());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn network_name(mut self, name: impl Into<String>) -> Self {
        self.network_name = Some(name.into());
        self
    }

    pub fn subnet(mut self, subnet: impl Into<String>) -> Self {
        self.subnet = Some(subnet.into());
        self
    }

    pub fn bootstrap_ip(mut self, ip: impl Into<String>) -> Self {
        self.bootstrap_ip = Some(ip.into());
        self
    }

    pub fn seed_ip(mut self, ip: impl Into<String>) -> Self {
        self.seed_ip = Some(ip.into());
        self
    }

    pub fn latency(mut self, latency: Option<Duration>) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn block_slots(mut self, slots: usize) -> Self {
        self.block_slots = Some(slots);
        self
    }

    pub fn block_actions(mut self, actions: usize) -> Self {
        self.block_actions = Some(actions);
        self
    }

    pub fn blocks_per_action(mut self, blocks: u32) -> Self {
        self.blocks_per_action = Some(blocks);
        self
    }

    pub fn tx_slots(mut self, slots: usize) -> Self {
        self.tx_slots = Some(slots);
        self
    }

    pub fn tx_actions(mut self, actions: usize) -> Self {
        self.tx_actions = Some(actions);
        self
    }

    pub fn tx_amount(mut self, amount: impl Into<String>) -> Self {
        self.tx_amount = Some(amount.into());
        self
    }

    pub fn warmup_chain_depth(mut self, depth: u32) -> Self {
        self.warmup_chain_depth = Some(depth);
        self
    }

    pub fn network_settle(mut self, settle: Duration) -> Self {
        self.network_settle = Some(settle);
        self
    }

    pub fn startup_settle(mut self, settle: Duration) -> Self {
        self.startup_settle = Some(settle);
        self
    }

    pub fn warmup_settle(mut self, settle: Duration) -> Self {
        self.warmup_settle = Some(settle);
        self
    }

    pub fn spread_settle(mut self, settle: Duration) -> Self {
        self.spread_settle = Some(settle);
        self
    }

    pub fn data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = Some(root.into());
        self
    }

    pub fn run_tag(mut self, tag: impl Into<String>) -> Self {
        self.run_tag = Some(tag.into());
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<RunConfig> {
        let config = RunConfig {
            node_count: self.node_count.unwrap_or(DEFAULT_NODE_COUNT),
            container_prefix: self
                .container_prefix
                .unwrap_or_else(|| DEFAULT_CONTAINER_PREFIX.to_owned()),
            image: self.image.unwrap_or_else(|| DEFAULT_IMAGE.to_owned()),
            network_name: self
                .network_name
                .unwrap_or_else(|| DEFAULT_NETWORK_NAME.to_owned()),
            subnet: self.subnet.unwrap_or_else(|| DEFAULT_SUBNET.to_owned()),
            bootstrap_ip: self
                .bootstrap_ip
                .unwrap_or_else(|| DEFAULT_BOOTSTRAP_IP.to_owned()),
            seed_ip: self.seed_ip.unwrap_or_else(|| DEFAULT_SEED_IP.to_owned()),
            latency: self
                .latency
                .unwrap_or(Some(Duration::from_millis(DEFAULT_LATENCY_MS))),
            block_slots: self.block_slots.unwrap_or(DEFAULT_BLOCK_SLOTS),
            block_actions: self.block_actions.unwrap_or(DEFAULT_BLOCK_ACTIONS),
            blocks_per_action: self.blocks_per_action.unwrap_or(1),
            tx_slots: self.tx_slots.unwrap_or(DEFAULT_TX_SLOTS),
            tx_actions: self.tx_actions.unwrap_or(DEFAULT_TX_ACTIONS),
            tx_amount: self
                .tx_amount
                .unwrap_or_else(|| DEFAULT_TX_AMOUNT.to_owned()),
            warmup_chain_depth: self
                .warmup_chain_depth
                .unwrap_or(DEFAULT_WARMUP_CHAIN_DEPTH),
            network_settle: self
                .network_settle
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_NETWORK_SETTLE_SECS)),
            startup_settle: self
                .startup_settle
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_STARTUP_SETTLE_SECS)),
            warmup_settle: self
                .warmup_settle
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_WARMUP_SETTLE_SECS)),
            spread_settle: self
                .spread_settle
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_SPREAD_SETTLE_SECS)),
            data_root: self.data_root.context("data_root is required")?,
            run_tag: self.run_tag.context("run_tag is required")?,
            rng_seed: self.rng_seed,
        };

        config.validate()?;
        Ok(config)
    }
}

fn ensure_shell_safe(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} cannot be empty");
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':' | '/'))
    {
        bail!("{field} {value:?} contains characters unsafe for shell composition");
    }
    Ok(())
}
