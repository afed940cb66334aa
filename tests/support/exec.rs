use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use forklab::cluster::docker;
use forklab::{CliCall, Command, CommandExecutor, CommandOutput, DataLayout};
use futures::future::BoxFuture;

/// Records every rendered command and fails the ones matching a configured
/// substring. Settle barriers are acknowledged without sleeping so harness
/// runs stay fast.
#[derive(Default)]
pub struct ScriptedExecutor {
    pub seen: Mutex<Vec<String>>,
    fail_matching: Vec<String>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_matching(mut self, needle: impl Into<String>) -> Self {
        self.fail_matching.push(needle.into());
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(async move {
            let rendered = docker::render(command);
            self.seen.lock().unwrap().push(rendered.clone());
            if self
                .fail_matching
                .iter()
                .any(|needle| rendered.contains(needle))
            {
                bail!("scripted failure for: {rendered}");
            }
            Ok(CommandOutput::default())
        })
    }
}

/// Emulates a cluster whose nodes write their artifacts when the plan's
/// chain-tip capture runs: executing `CaptureChainTips` for a node deposits
/// that node's debug log and chain-tip JSON into the host layout, the way a
/// real container would have. Nodes marked silent write nothing, which is
/// how a crashed or wedged node looks to the aggregator.
pub struct SimulatedClusterExecutor {
    layout: DataLayout,
    logs: HashMap<String, String>,
    tips: HashMap<String, String>,
    silent: HashSet<String>,
    pub seen: Mutex<Vec<String>>,
}

impl SimulatedClusterExecutor {
    pub fn new(layout: DataLayout) -> Self {
        Self {
            layout,
            logs: HashMap::new(),
            tips: HashMap::new(),
            silent: HashSet::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_node_log(mut self, id: &str, raw: impl Into<String>) -> Self {
        self.logs.insert(id.to_owned(), raw.into());
        self
    }

    pub fn with_chain_tips(mut self, id: &str, json: impl Into<String>) -> Self {
        self.tips.insert(id.to_owned(), json.into());
        self
    }

    pub fn with_silent_node(mut self, id: &str) -> Self {
        self.silent.insert(id.to_owned());
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn deposit_artifacts(&self, node: &forklab::NodeId) -> Result<()> {
        let log = self
            .logs
            .get(node.as_str())
            .cloned()
            .unwrap_or_else(|| default_log(node.as_str()));
        let tips = self
            .tips
            .get(node.as_str())
            .cloned()
            .unwrap_or_else(default_tips);

        let log_path = self.layout.debug_log(node);
        let parent = log_path
            .parent()
            .context("debug log path has no parent")?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        fs::write(&log_path, log)
            .with_context(|| format!("failed to write {}", log_path.display()))?;
        fs::write(self.layout.chain_tips(node), tips)
            .with_context(|| format!("failed to write chain tips for {node}"))?;
        Ok(())
    }
}

impl CommandExecutor for SimulatedClusterExecutor {
    fn run<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(docker::render(command));
            if let Command::Cli {
                node,
                call: CliCall::CaptureChainTips,
            } = command
            {
                if !self.silent.contains(node.as_str()) {
                    self.deposit_artifacts(node)?;
                }
            }
            Ok(CommandOutput::default())
        })
    }
}

fn default_log(node: &str) -> String {
    format!(
        "2020-01-01 00:00:00.000000 init message from {node}\n\
         2020-01-01 00:00:01.000000 UpdateTip: new best=00aa height=1\n"
    )
}

fn default_tips() -> String {
    r#"[{"height": 1, "hash": "00aa", "branchlen": 0, "status": "active"}]"#.to_owned()
}
