//! Typed command model for one orchestrated run. Commands carry kind plus
//! parameters only; they are rendered to shell text at the executor boundary
//! (`cluster::docker`), so scheduling and plan assembly stay free of
//! shell-escaping concerns.

use crate::cluster::topology::NodeId;
use std::path::PathBuf;
use std::time::Duration;

/// Which daemon flag set a container starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Bootstrap,
    Peer,
}

/// Parameters for one `bitcoind` invocation inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonSpec {
    pub role: NodeRole,
    /// Artificial egress delay injected with `tc netem`; `None` disables the
    /// qdisc setup entirely.
    pub latency: Option<Duration>,
    pub bootstrap_ip: String,
    pub seed_ip: String,
}

/// A single RPC-over-CLI call issued inside a node container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCall {
    /// Mine `blocks` blocks on the target node.
    Generate { blocks: u32 },
    /// Send `amount` coins to a freshly derived address owned by the same
    /// wallet, producing one broadcastable transaction.
    SendToSelf { amount: String },
    /// Dump `getchaintips` into the node's datadir for later collection.
    CaptureChainTips,
    GetPeerInfo,
}

/// One unit of work a plan can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateNetwork {
        name: String,
        subnet: String,
    },
    RemoveNetwork {
        name: String,
    },
    StartBootstrap {
        network: String,
        ip: String,
        image: String,
        daemon: DaemonSpec,
    },
    StartNode {
        id: NodeId,
        network: String,
        image: String,
        host_dir: PathBuf,
        daemon: DaemonSpec,
    },
    StopNode {
        id: NodeId,
    },
    Cli {
        node: NodeId,
        call: CliCall,
    },
    /// Boundary marker between scheduling ticks; carries no node work.
    TickMarker {
        tick: usize,
    },
    /// Coarse time-based barrier between dependent phases.
    Settle {
        duration: Duration,
    },
    /// Recursive chmod over the host data root so container-written files are
    /// readable during aggregation.
    FixPermissions {
        host_root: PathBuf,
        image: String,
    },
}

impl Command {
    /// True for commands that perform node work, as opposed to markers and
    /// settle barriers.
    pub fn is_action(&self) -> bool {
        matches!(self, Command::Cli { .. })
    }
}

/// A scheduled action: one CLI call bound to the node that executes it. The
/// target node is resolved by the caller before scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub node: NodeId,
    pub call: CliCall,
}

impl Action {
    pub fn generate(node: NodeId, blocks: u32) -> Self {
        Self {
            node,
            call: CliCall::Generate { blocks },
        }
    }

    pub fn send_to_self(node: NodeId, amount: impl Into<String>) -> Self {
        Self {
            node,
            call: CliCall::SendToSelf {
                amount: amount.into(),
            },
        }
    }

    pub fn into_command(self) -> Command {
        Command::Cli {
            node: self.node,
            call: self.call,
        }
    }
}
