//! End-to-end run against a real docker daemon. Needs a host image with
//! `bitcoind`, `bitcoin-cli`, and `tc` installed, so it only runs when
//! `FORKLAB_RUN_DOCKER_TESTS` is set.

use crate::support::helpers::{docker_tests_enabled, init_tracing};
use anyhow::Result;
use forklab::{RunConfig, Runner, ShellExecutor};
use std::env;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn docker_run_completes_and_merges_logs() -> Result<()> {
    init_tracing();
    if !docker_tests_enabled() {
        eprintln!("skipping docker end-to-end test; set FORKLAB_RUN_DOCKER_TESTS=1 to enable");
        return Ok(());
    }

    let dir = tempfile::tempdir()?;
    let mut builder = RunConfig::builder()
        .node_count(2)
        .block_slots(2)
        .block_actions(4)
        .tx_slots(2)
        .tx_actions(1)
        .warmup_settle(Duration::from_secs(5))
        .spread_settle(Duration::from_secs(5))
        .data_root(dir.path())
        .run_tag("docker-e2e")
        .rng_seed(1);
    if let Ok(image) = env::var("FORKLAB_IMAGE") {
        builder = builder.image(image);
    }

    let runner = Runner::new(builder.build()?);
    let report = runner.run(&ShellExecutor::new()).await?;

    assert!(
        report.aggregate.is_clean(),
        "every node should contribute logs and tips: {:?}",
        report.aggregate.failures
    );
    assert!(!report.aggregate.merged.is_empty());
    assert_eq!(report.aggregate.forks.entries().len(), 2);
    Ok(())
}
