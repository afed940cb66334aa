//! Structured record kinds the artifact writer knows how to persist, and the
//! concrete rows an orchestration run produces. Records carry their own CSV
//! header; the writer appends the run tag column to every row.

use crate::cluster::topology::NodeId;
use crate::exec::drive::CommandFailure;
use crate::logs::tips::ForkSummary;
use crate::plan::scheduler::TickSummary;

/// Logical record kinds the writer persists, one delimited table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    ReceivedBlock,
    BlockProcessed,
    Tx,
    TxException,
    BlockException,
    TickInfo,
    RpcException,
    Tip,
}

impl RecordKind {
    pub fn file_stem(self) -> &'static str {
        match self {
            RecordKind::ReceivedBlock => "blocks_received",
            RecordKind::BlockProcessed => "blocks",
            RecordKind::Tx => "txs",
            RecordKind::TxException => "tx_exceptions",
            RecordKind::BlockException => "block_exceptions",
            RecordKind::TickInfo => "tick_infos",
            RecordKind::RpcException => "rpc_exceptions",
            RecordKind::Tip => "tips",
        }
    }
}

/// A homogeneous row type for one delimited table.
pub trait TableRecord {
    fn header() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
}

/// Per-tick scheduled action counts.
#[derive(Debug, Clone, Copy)]
pub struct TickRecord {
    pub tick: usize,
    pub blocks: usize,
    pub transactions: usize,
}

impl From<TickSummary> for TickRecord {
    fn from(summary: TickSummary) -> Self {
        Self {
            tick: summary.tick,
            blocks: summary.blocks,
            transactions: summary.transactions,
        }
    }
}

impl TableRecord for TickRecord {
    fn header() -> &'static [&'static str] {
        &["tick", "blocks", "transactions"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.tick.to_string(),
            self.blocks.to_string(),
            self.transactions.to_string(),
        ]
    }
}

/// One node's reported chain-tip count.
#[derive(Debug, Clone)]
pub struct TipRecord {
    pub node: NodeId,
    pub tips: usize,
}

impl TipRecord {
    pub fn from_summary(summary: &ForkSummary) -> Vec<Self> {
        summary
            .entries()
            .iter()
            .map(|(node, tips)| Self {
                node: node.clone(),
                tips: *tips,
            })
            .collect()
    }
}

impl TableRecord for TipRecord {
    fn header() -> &'static [&'static str] {
        &["node", "tips"]
    }

    fn fields(&self) -> Vec<String> {
        vec![self.node.to_string(), self.tips.to_string()]
    }
}

/// One command that failed during plan execution.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub index: usize,
    pub command: String,
    pub error: String,
}

impl From<&CommandFailure> for FailureRecord {
    fn from(failure: &CommandFailure) -> Self {
        Self {
            index: failure.index,
            command: failure.rendered.clone(),
            error: failure.error.clone(),
        }
    }
}

impl TableRecord for FailureRecord {
    fn header() -> &'static [&'static str] {
        &["index", "command", "error"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            self.command.clone(),
            self.error.clone(),
        ]
    }
}
