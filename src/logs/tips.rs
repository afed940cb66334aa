//! Chain-tip fork detection. Each node reports its `getchaintips` array; the
//! array length is the node's fork count, a simple divergence indicator for
//! the partitioned-network experiments this tool drives.

use crate::cluster::topology::NodeId;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;

/// One entry of a node's `getchaintips` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainTip {
    pub height: u64,
    pub hash: String,
    pub branchlen: u64,
    pub status: String,
}

/// Number of chain tips a node reported.
pub fn parse_fork_count(raw: &str) -> Result<usize> {
    let tips: Vec<ChainTip> =
        serde_json::from_str(raw).context("chain tip report is not a JSON tip array")?;
    Ok(tips.len())
}

/// Fork counts per node, kept in node-iteration order and rendered one
/// labeled line per node.
#[derive(Debug, Default)]
pub struct ForkSummary {
    entries: Vec<(NodeId, usize)>,
}

impl ForkSummary {
    pub fn push(&mut self, node: NodeId, forks: usize) {
        self.entries.push((node, forks));
    }

    pub fn entries(&self) -> &[(NodeId, usize)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nodes reporting more than one tip, i.e. nodes that observed a fork.
    pub fn diverged(&self) -> impl Iterator<Item = &(NodeId, usize)> {
        self.entries.iter().filter(|(_, forks)| *forks > 1)
    }
}

impl fmt::Display for ForkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, forks) in &self.entries {
            writeln!(f, "{node} {forks}")?;
        }
        Ok(())
    }
}
