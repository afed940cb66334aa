//! Orchestrates one full run: purge stale data, build the plan, drive it,
//! aggregate node logs, and persist artifacts. Plan construction is pure;
//! everything issued goes through the supplied [`CommandExecutor`].

use crate::artifacts::records::{FailureRecord, RecordKind, TickRecord, TipRecord};
use crate::artifacts::writer::{ArtifactWriter, RunInfo, StepTimes};
use crate::cluster::topology::Topology;
use crate::exec::drive::{drive_plan, ExecutionReport};
use crate::exec::executor::CommandExecutor;
use crate::logs::aggregate::{AggregateReport, LogAggregator};
use crate::plan::builder::{Plan, PlanBuilder};
use crate::plan::command::Command;
use crate::plan::scheduler::{Scheduler, TickSummary};
use crate::runtime::config::RunConfig;
use crate::runtime::telemetry::{self, Telemetry};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

/// Everything one orchestrated run produced.
#[derive(Debug)]
pub struct RunReport {
    pub execution: ExecutionReport,
    pub aggregate: AggregateReport,
    pub artifacts: Vec<PathBuf>,
    pub info: RunInfo,
}

pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn rng(&self) -> StdRng {
        match self.config.rng_seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Builds the full plan for this configuration. Pure computation; no
    /// command is issued.
    pub fn build_plan<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Plan, Vec<TickSummary>)> {
        let topology = Topology::from_config(&self.config)?;
        self.plan_with_topology(&topology, rng)
    }

    fn plan_with_topology<R: Rng + ?Sized>(
        &self,
        topology: &Topology,
        rng: &mut R,
    ) -> Result<(Plan, Vec<TickSummary>)> {
        let config = &self.config;
        let mut summaries = Vec::new();

        let (plan, outcome) = PlanBuilder::new().build(|builder| {
            let (setup, release) = topology.network_segments();
            builder.acquire(setup, release);
            let (setup, release) = topology.node_segments();
            builder.acquire(setup, release);

            builder.extend(topology.warmup(rng));

            let mut scheduler = Scheduler::new();
            let blocks = (0..config.block_actions())
                .map(|_| topology.random_block_action(rng, config.blocks_per_action()))
                .collect();
            scheduler.add_block_actions(config.block_slots(), blocks, rng);
            let transactions = (0..config.tx_actions())
                .map(|_| topology.random_transaction_action(rng, config.tx_amount()))
                .collect();
            scheduler.add_transaction_actions(config.tx_slots(), transactions, rng);
            builder.extend(scheduler.render());
            summaries = scheduler.summaries();

            builder.push(Command::Settle {
                duration: config.spread_settle(),
            });
            builder.extend(topology.capture_chain_tips());
            builder.push(topology.fix_permissions());
            Ok(())
        });

        outcome?;
        Ok((plan, summaries))
    }

    /// Runs the whole orchestration once and reports what happened. Command
    /// failures and per-node aggregation failures are collected, not fatal;
    /// only configuration and artifact-persistence errors abort.
    pub async fn run(&self, executor: &dyn CommandExecutor) -> Result<RunReport> {
        let run_start = now_epoch();
        let telemetry = Arc::new(Telemetry::default());

        let topology = Topology::from_config(&self.config)?;
        self.purge_data_root(&topology).await?;
        let mut rng = self.rng();
        let (plan, summaries) = self.plan_with_topology(&topology, &mut rng)?;

        tracing::info!(
            commands = plan.len(),
            nodes = topology.node_ids().len(),
            tag = self.config.run_tag(),
            "starting orchestrated run"
        );

        let (stop_reporter, reporter_signal) = watch::channel(false);
        let reporter = telemetry::spawn_metrics_reporter(
            telemetry.clone(),
            reporter_signal,
            telemetry::DEFAULT_METRICS_INTERVAL,
        );

        let execution = drive_plan(executor, &plan, &telemetry).await;

        let _ = stop_reporter.send(true);
        if let Err(err) = reporter.await {
            tracing::warn!(error = %err, "metrics reporter task panicked");
        }
        let execution_end = now_epoch();

        let aggregate = LogAggregator::new(topology.layout().clone()).aggregate(topology.node_ids());
        telemetry.record_merged_lines(aggregate.merged.len() as u64);
        telemetry.record_nodes_aggregated(topology.node_ids().len());
        for failure in &aggregate.failures {
            telemetry.record_node_failure();
            tracing::warn!(
                node = %failure.node,
                error = %failure.error,
                "node artifact missing from aggregation"
            );
        }

        let layout = topology.layout();
        tokio::fs::write(layout.merged_log(), aggregate.merged.to_string())
            .await
            .with_context(|| format!("failed to write {}", layout.merged_log().display()))?;
        tokio::fs::write(layout.forks_file(), aggregate.forks.to_string())
            .await
            .with_context(|| format!("failed to write {}", layout.forks_file().display()))?;

        let writer = ArtifactWriter::new(self.config.data_root(), self.config.run_tag());
        let ticks: Vec<TickRecord> = summaries.iter().copied().map(TickRecord::from).collect();
        let tips = TipRecord::from_summary(&aggregate.forks);
        let failures: Vec<FailureRecord> =
            execution.failures.iter().map(FailureRecord::from).collect();

        let mut artifacts = vec![layout.merged_log(), layout.forks_file()];
        artifacts.push(writer.write(RecordKind::TickInfo, &ticks)?);
        artifacts.push(writer.write(RecordKind::Tip, &tips)?);
        artifacts.push(writer.write(RecordKind::RpcException, &failures)?);

        let failed_nodes: std::collections::BTreeSet<_> = aggregate
            .failures
            .iter()
            .map(|failure| failure.node.clone())
            .collect();
        let info = RunInfo {
            tag: self.config.run_tag().to_owned(),
            nodes: topology.node_ids().len(),
            plan_commands: plan.len(),
            commands_failed: execution.failures.len(),
            nodes_failed: failed_nodes.len(),
            step_times: StepTimes {
                run_start,
                execution_end,
                postprocessing_end: now_epoch(),
            },
        };
        artifacts.push(writer.write_run_info(&info)?);

        tracing::info!(
            merged_lines = aggregate.merged.len(),
            commands_failed = execution.failures.len(),
            nodes_failed = aggregate.failures.len(),
            "run complete"
        );

        Ok(RunReport {
            execution,
            aggregate,
            artifacts,
            info,
        })
    }

    /// Clears leftovers of a previous run so stale logs never leak into this
    /// run's aggregation. The root itself is kept.
    async fn purge_data_root(&self, topology: &Topology) -> Result<()> {
        let layout = topology.layout();
        tokio::fs::create_dir_all(layout.root())
            .await
            .with_context(|| format!("failed to create {}", layout.root().display()))?;

        for id in topology.node_ids() {
            remove_dir_if_present(&layout.node_dir(id)).await?;
        }
        remove_file_if_present(&layout.merged_log()).await?;
        remove_file_if_present(&layout.forks_file()).await?;
        Ok(())
    }
}

async fn remove_dir_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to purge {}", path.display())),
    }
}

async fn remove_file_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to purge {}", path.display())),
    }
}

fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}
