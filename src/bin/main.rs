use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use forklab::{init_tracing, RunConfig, Runner, ShellExecutor};

const DEFAULT_DATA_ROOT: &str = "./data";
const DEFAULT_RUN_TAG: &str = "local";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = RunArgs::from_env()?;
    let config = args.to_run_config()?;
    let runner = Runner::new(config);
    let executor = ShellExecutor::new();

    let report = runner.run(&executor).await?;

    println!(
        "plan: {} commands, {} failed",
        report.info.plan_commands, report.info.commands_failed
    );
    println!("merged log lines: {}", report.aggregate.merged.len());
    for (node, forks) in report.aggregate.forks.entries() {
        println!("forks {node}: {forks}");
    }
    for failure in &report.aggregate.failures {
        eprintln!("node {} failed aggregation: {}", failure.node, failure.error);
    }
    if !report.execution.is_clean() {
        eprintln!(
            "{} command(s) failed; see {}",
            report.execution.failures.len(),
            runner.config().data_root().join("rpc_exceptions.csv").display()
        );
    }

    Ok(())
}

/// Environment-driven overrides for one run. Every knob has a default, so a
/// bare `forklab` invocation drives a full local experiment.
struct RunArgs {
    nodes: Option<usize>,
    block_slots: Option<usize>,
    block_actions: Option<usize>,
    tx_slots: Option<usize>,
    tx_actions: Option<usize>,
    latency_ms: Option<u64>,
    warmup_depth: Option<u32>,
    image: Option<String>,
    data_root: String,
    run_tag: String,
    seed: Option<u64>,
}

impl RunArgs {
    fn from_env() -> Result<Self> {
        Ok(Self {
            nodes: parse_env("FORKLAB_NODES")?,
            block_slots: parse_env("FORKLAB_BLOCK_SLOTS")?,
            block_actions: parse_env("FORKLAB_BLOCK_ACTIONS")?,
            tx_slots: parse_env("FORKLAB_TX_SLOTS")?,
            tx_actions: parse_env("FORKLAB_TX_ACTIONS")?,
            latency_ms: parse_env("FORKLAB_LATENCY_MS")?,
            warmup_depth: parse_env("FORKLAB_WARMUP_DEPTH")?,
            image: env_string("FORKLAB_IMAGE"),
            data_root: env_string("FORKLAB_DATA_ROOT")
                .unwrap_or_else(|| DEFAULT_DATA_ROOT.to_owned()),
            run_tag: env_string("FORKLAB_RUN_TAG").unwrap_or_else(|| DEFAULT_RUN_TAG.to_owned()),
            seed: parse_env("FORKLAB_SEED")?,
        })
    }

    fn to_run_config(&self) -> Result<RunConfig> {
        let mut builder = RunConfig::builder()
            .data_root(&self.data_root)
            .run_tag(&self.run_tag);

        if let Some(nodes) = self.nodes {
            builder = builder.node_count(nodes);
        }
        if let Some(slots) = self.block_slots {
            builder = builder.block_slots(slots);
        }
        if let Some(actions) = self.block_actions {
            builder = builder.block_actions(actions);
        }
        if let Some(slots) = self.tx_slots {
            builder = builder.tx_slots(slots);
        }
        if let Some(actions) = self.tx_actions {
            builder = builder.tx_actions(actions);
        }
        if let Some(latency_ms) = self.latency_ms {
            let latency = (latency_ms > 0).then(|| Duration::from_millis(latency_ms));
            builder = builder.latency(latency);
        }
        if let Some(depth) = self.warmup_depth {
            builder = builder.warmup_chain_depth(depth);
        }
        if let Some(image) = &self.image {
            builder = builder.image(image);
        }
        if let Some(seed) = self.seed {
            builder = builder.rng_seed(seed);
        }

        builder.build()
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_string(key) {
        Some(raw) => {
            let parsed = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid value {raw:?} for {key}"))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
