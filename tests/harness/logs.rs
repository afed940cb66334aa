use crate::support::helpers::{forked_tips_json, init_tracing, single_tip_json};
use forklab::logs::aggregate::{flatten_node_log, merge_tagged};
use forklab::{DataLayout, LogAggregator, NodeId};
use std::fs;

fn node(name: &str) -> NodeId {
    NodeId::new(name).unwrap()
}

#[test]
fn merged_output_is_time_sorted_across_nodes() {
    init_tracing();
    let a = flatten_node_log(
        &node("a"),
        "2020-01-01 00:00:00.000000 first\n2020-01-01 00:00:02.000000 third\n",
    );
    let b = flatten_node_log(&node("b"), "2020-01-01 00:00:01.000000 second\n");

    let merged = merge_tagged(vec![(node("a"), a), (node("b"), b)]);
    let lines = merged.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("a first"));
    assert!(lines[1].ends_with("b second"));
    assert!(lines[2].ends_with("a third"));
}

#[test]
fn continuation_lines_never_reach_the_output() {
    let raw = "2020-01-01 00:00:00.000000 top level\n   at frame one\n   at frame two\n\n";
    let merged = merge_tagged(vec![(node("a"), flatten_node_log(&node("a"), raw))]);

    assert_eq!(merged.lines().len(), 1);
    let rendered = merged.to_string();
    assert!(!rendered.contains("frame one"));
    assert!(!rendered.contains("\n\n"), "no blank lines may survive");
}

#[test]
fn two_node_scenario_tags_and_drops_the_stack_trace() {
    let a_raw = "2020-01-01 00:00:00.000000 hello\n   stack trace line\n";
    let b_raw = "2020-01-01 00:00:01.000000 world\n";

    let merged = merge_tagged(vec![
        (node("a"), flatten_node_log(&node("a"), a_raw)),
        (node("b"), flatten_node_log(&node("b"), b_raw)),
    ]);

    assert_eq!(
        merged.lines(),
        &[
            "2020-01-01 00:00:00.000000 a hello".to_owned(),
            "2020-01-01 00:00:01.000000 b world".to_owned(),
        ]
    );
}

#[test]
fn aggregator_reads_layout_and_counts_forks() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let healthy = node("fl-0");
    let forked = node("fl-1");

    for (id, tips) in [(&healthy, single_tip_json(5)), (&forked, forked_tips_json(5))] {
        fs::create_dir_all(layout.debug_log(id).parent().unwrap()).unwrap();
        fs::write(
            layout.debug_log(id),
            format!("2020-01-01 00:00:00.000000 booted {id}\n"),
        )
        .unwrap();
        fs::write(layout.chain_tips(id), tips).unwrap();
    }

    let report =
        LogAggregator::new(layout).aggregate(&[healthy.clone(), forked.clone()]);
    assert!(report.is_clean());
    assert_eq!(report.merged.len(), 2);
    assert_eq!(report.forks.entries(), &[(healthy, 1), (forked, 2)]);
}

#[test]
fn missing_node_fails_loudly_but_keeps_healthy_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let healthy = node("fl-0");
    let missing = node("fl-9");

    fs::create_dir_all(layout.debug_log(&healthy).parent().unwrap()).unwrap();
    fs::write(
        layout.debug_log(&healthy),
        "2020-01-01 00:00:00.000000 alive\n",
    )
    .unwrap();
    fs::write(layout.chain_tips(&healthy), single_tip_json(3)).unwrap();

    let report = LogAggregator::new(layout).aggregate(&[healthy.clone(), missing.clone()]);

    assert_eq!(report.merged.len(), 1, "healthy node still merges");
    assert_eq!(report.forks.entries().len(), 1);
    assert_eq!(
        report
            .failures
            .iter()
            .filter(|failure| failure.node == missing)
            .count(),
        2,
        "both the log and the tip artifact must be reported missing"
    );
}

#[test]
fn corrupt_tip_report_is_a_failure_for_that_node() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    let id = node("fl-0");

    fs::create_dir_all(layout.debug_log(&id).parent().unwrap()).unwrap();
    fs::write(layout.debug_log(&id), "2020-01-01 00:00:00.000000 up\n").unwrap();
    fs::write(layout.chain_tips(&id), "not json at all").unwrap();

    let report = LogAggregator::new(layout).aggregate(&[id.clone()]);
    assert_eq!(report.merged.len(), 1);
    assert!(report.forks.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("chain tips"));
}
