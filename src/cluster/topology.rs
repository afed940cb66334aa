//! The shape of one simulated network: node identities, the isolated bridge
//! network they join, and the command segments that bring the cluster up,
//! warm it, inspect it, and tear it down.

use crate::cluster::paths::DataLayout;
use crate::plan::command::{Action, CliCall, Command, DaemonSpec, NodeRole};
use crate::runtime::config::RunConfig;
use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::time::Duration;

/// Opaque identifier naming one participant container. Doubles as a
/// filesystem path segment and a log-line tag, so it must stay non-empty and
/// shell safe. Unique within a run by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            bail!("node id cannot be empty");
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            bail!("node id {raw:?} contains characters unsafe for paths or shells");
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Topology {
    ids: Vec<NodeId>,
    network: String,
    subnet: String,
    bootstrap_ip: String,
    seed_ip: String,
    image: String,
    latency: Option<Duration>,
    warmup_chain_depth: u32,
    network_settle: Duration,
    startup_settle: Duration,
    warmup_settle: Duration,
    layout: DataLayout,
}

impl Topology {
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let ids = (0..config.node_count())
            .map(|index| NodeId::new(format!("{}{index}", config.container_prefix())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ids,
            network: config.network_name().to_owned(),
            subnet: config.subnet().to_owned(),
            bootstrap_ip: config.bootstrap_ip().to_owned(),
            seed_ip: config.seed_ip().to_owned(),
            image: config.image().to_owned(),
            latency: config.latency(),
            warmup_chain_depth: config.warmup_chain_depth(),
            network_settle: config.network_settle(),
            startup_settle: config.startup_settle(),
            warmup_settle: config.warmup_settle(),
            layout: DataLayout::new(config.data_root()),
        })
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn random_node<R: Rng + ?Sized>(&self, rng: &mut R) -> &NodeId {
        self.ids
            .choose(rng)
            .expect("topology always holds at least one node")
    }

    fn daemon(&self, role: NodeRole) -> DaemonSpec {
        DaemonSpec {
            role,
            latency: self.latency,
            bootstrap_ip: self.bootstrap_ip.clone(),
            seed_ip: self.seed_ip.clone(),
        }
    }

    /// Bridge network acquisition paired with its removal.
    pub fn network_segments(&self) -> (Vec<Command>, Vec<Command>) {
        let setup = vec![
            Command::CreateNetwork {
                name: self.network.clone(),
                subnet: self.subnet.clone(),
            },
            Command::Settle {
                duration: self.network_settle,
            },
        ];
        let release = vec![Command::RemoveNetwork {
            name: self.network.clone(),
        }];
        (setup, release)
    }

    /// Container acquisition: the introductory bootstrap node first, then
    /// every peer, then a settle wait so daemons finish warming up before
    /// the first generate call. Release force-stops the peers, then the
    /// bootstrap node, then waits for the containers to unwind.
    pub fn node_segments(&self) -> (Vec<Command>, Vec<Command>) {
        let mut setup = vec![Command::StartBootstrap {
            network: self.network.clone(),
            ip: self.bootstrap_ip.clone(),
            image: self.image.clone(),
            daemon: self.daemon(NodeRole::Bootstrap),
        }];
        for id in &self.ids {
            setup.push(Command::StartNode {
                id: id.clone(),
                network: self.network.clone(),
                image: self.image.clone(),
                host_dir: self.layout.node_dir(id),
                daemon: self.daemon(NodeRole::Peer),
            });
        }
        setup.push(Command::Settle {
            duration: self.startup_settle,
        });

        let mut release: Vec<Command> = self
            .ids
            .iter()
            .map(|id| Command::StopNode { id: id.clone() })
            .collect();
        release.push(Command::StopNode {
            id: NodeId::new("bootstrap").expect("static id is valid"),
        });
        release.push(Command::Settle {
            duration: Duration::from_secs(5),
        });
        (setup, release)
    }

    /// Warm-up generation: one block per node so every wallet owns a
    /// coinbase, then a bulk catch-up on a random node deep enough to cross
    /// the spendability maturity threshold, then a settle wait.
    pub fn warmup<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Command> {
        let mut commands: Vec<Command> = self
            .ids
            .iter()
            .map(|id| Command::Cli {
                node: id.clone(),
                call: CliCall::Generate { blocks: 1 },
            })
            .collect();
        commands.push(
            self.random_block_action(rng, self.warmup_chain_depth)
                .into_command(),
        );
        commands.push(Command::Settle {
            duration: self.warmup_settle,
        });
        commands
    }

    pub fn random_block_action<R: Rng + ?Sized>(&self, rng: &mut R, blocks: u32) -> Action {
        Action::generate(self.random_node(rng).clone(), blocks)
    }

    pub fn random_transaction_action<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        amount: &str,
    ) -> Action {
        Action::send_to_self(self.random_node(rng).clone(), amount)
    }

    /// One chain-tip capture per node, written into each node's datadir.
    pub fn capture_chain_tips(&self) -> Vec<Command> {
        self.ids
            .iter()
            .map(|id| Command::Cli {
                node: id.clone(),
                call: CliCall::CaptureChainTips,
            })
            .collect()
    }

    pub fn fix_permissions(&self) -> Command {
        Command::FixPermissions {
            host_root: self.layout.root().to_path_buf(),
            image: self.image.clone(),
        }
    }
}
