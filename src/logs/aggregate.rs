//! Multi-source log merge. Each node's raw debug log is flattened to one
//! line per event, tagged with the node id right after the fixed-width
//! timestamp prefix, and merged into a single time-ordered stream. This is a
//! best-effort textual flattening, not a structured parser: multi-line stack
//! traces keep only their header line so the merged log stays scannable.

use crate::cluster::paths::DataLayout;
use crate::cluster::topology::NodeId;
use crate::logs::tips::{parse_fork_count, ForkSummary};
use std::fmt;
use std::fs;

/// Width of the literal timestamp prefix every genuine record starts with,
/// e.g. `2016-09-22 14:46:41.706605`.
pub const TIMESTAMP_WIDTH: usize = "2016-09-22 14:46:41.706605".len();

/// The globally merged, node-tagged log.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergedLog {
    lines: Vec<String>,
}

impl MergedLog {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for MergedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// A node whose artifact could not contribute to the aggregate.
#[derive(Debug, Clone)]
pub struct NodeFailure {
    pub node: NodeId,
    pub error: String,
}

/// Aggregation outcome: the merged log and fork summary for every healthy
/// node, plus an explicit failure entry for every node whose log or tip
/// artifact was missing or unreadable. A bad node never silently shortens
/// the merged output.
#[derive(Debug, Default)]
pub struct AggregateReport {
    pub merged: MergedLog,
    pub forks: ForkSummary,
    pub failures: Vec<NodeFailure>,
}

impl AggregateReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reads per-node artifacts from a [`DataLayout`] and runs the pure merge
/// over them.
#[derive(Debug, Clone)]
pub struct LogAggregator {
    layout: DataLayout,
}

impl LogAggregator {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn aggregate(&self, ids: &[NodeId]) -> AggregateReport {
        let mut report = AggregateReport::default();
        let mut tagged: Vec<(NodeId, Vec<String>)> = Vec::new();

        for id in ids {
            let log_path = self.layout.debug_log(id);
            match fs::read_to_string(&log_path) {
                Ok(raw) => tagged.push((id.clone(), flatten_node_log(id, &raw))),
                Err(err) => report.failures.push(NodeFailure {
                    node: id.clone(),
                    error: format!("debug log {}: {err}", log_path.display()),
                }),
            }

            let tips_path = self.layout.chain_tips(id);
            match fs::read_to_string(&tips_path) {
                Ok(raw) => match parse_fork_count(&raw) {
                    Ok(count) => report.forks.push(id.clone(), count),
                    Err(err) => report.failures.push(NodeFailure {
                        node: id.clone(),
                        error: format!("chain tips {}: {err:#}", tips_path.display()),
                    }),
                },
                Err(err) => report.failures.push(NodeFailure {
                    node: id.clone(),
                    error: format!("chain tips {}: {err}", tips_path.display()),
                }),
            }
        }

        report.merged = merge_tagged(tagged);
        report
    }
}

/// Flattens one node's raw log: tags every record header with the node id
/// and drops continuation content entirely. No blank lines survive.
pub fn flatten_node_log(id: &NodeId, raw: &str) -> Vec<String> {
    raw.lines()
        .filter(|line| !is_continuation(line))
        .map(|line| tag_line(id, line))
        .collect()
}

/// Merges per-node tagged lines into one stream, stably sorted by the
/// timestamp prefix with ties broken by node id; lines from the same node
/// with equal timestamps keep their original order.
pub fn merge_tagged(per_node: Vec<(NodeId, Vec<String>)>) -> MergedLog {
    let mut entries: Vec<(NodeId, String)> = per_node
        .into_iter()
        .flat_map(|(id, lines)| lines.into_iter().map(move |line| (id.clone(), line)))
        .collect();

    entries.sort_by(|a, b| {
        timestamp_prefix(&a.1)
            .cmp(timestamp_prefix(&b.1))
            .then_with(|| a.0.cmp(&b.0))
    });

    MergedLog {
        lines: entries.into_iter().map(|(_, line)| line).collect(),
    }
}

/// A continuation belongs to the preceding multi-line record: it either
/// starts with whitespace, or its timestamp slot is followed by a blank gap
/// (the shape wrapped error dumps take).
fn is_continuation(line: &str) -> bool {
    match line.chars().next() {
        None => true,
        Some(first) if first.is_whitespace() => true,
        Some(_) => {
            let bytes = line.as_bytes();
            bytes.len() >= TIMESTAMP_WIDTH + 2
                && bytes[TIMESTAMP_WIDTH] == b' '
                && bytes[TIMESTAMP_WIDTH + 1] == b' '
        }
    }
}

/// Inserts the node id immediately after the timestamp prefix. Lines too
/// short to carry a timestamp pass through untouched.
fn tag_line(id: &NodeId, line: &str) -> String {
    if line.len() < TIMESTAMP_WIDTH || !line.is_char_boundary(TIMESTAMP_WIDTH) {
        return line.to_owned();
    }
    let (timestamp, rest) = line.split_at(TIMESTAMP_WIDTH);
    format!("{timestamp} {id}{rest}")
}

fn timestamp_prefix(line: &str) -> &str {
    if line.len() >= TIMESTAMP_WIDTH && line.is_char_boundary(TIMESTAMP_WIDTH) {
        &line[..TIMESTAMP_WIDTH]
    } else {
        line
    }
}
