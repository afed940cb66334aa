//! Host-side layout of per-node data directories and run artifacts. Each
//! node's datadir is bind-mounted into its container at [`GUEST_DATA_DIR`];
//! everything the run produces lands under one root.

use crate::cluster::topology::NodeId;
use std::path::{Path, PathBuf};

/// Mount point of a node's datadir inside its container.
pub const GUEST_DATA_DIR: &str = "/data";

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn node_dir(&self, id: &NodeId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// The node's regtest debug log, written by bitcoind inside the
    /// container and read back on the host after the run settles.
    pub fn debug_log(&self, id: &NodeId) -> PathBuf {
        self.node_dir(id).join("regtest").join("debug.log")
    }

    /// The captured `getchaintips` JSON array for a node.
    pub fn chain_tips(&self, id: &NodeId) -> PathBuf {
        self.node_dir(id).join("chaintips.json")
    }

    pub fn merged_log(&self) -> PathBuf {
        self.root.join("log")
    }

    pub fn forks_file(&self) -> PathBuf {
        self.root.join("forks")
    }
}
