pub mod artifacts;
pub mod cluster;
pub mod exec;
pub mod logs;
pub mod plan;
pub mod runtime;

pub use artifacts::records::{FailureRecord, RecordKind, TableRecord, TickRecord, TipRecord};
pub use artifacts::writer::{ArtifactWriter, RunInfo, StepTimes};
pub use cluster::paths::DataLayout;
pub use cluster::topology::{NodeId, Topology};
pub use exec::drive::{drive_plan, CommandFailure, ExecutionReport};
pub use exec::executor::{CommandExecutor, CommandOutput, ShellExecutor};
pub use logs::aggregate::{
    AggregateReport, LogAggregator, MergedLog, NodeFailure, TIMESTAMP_WIDTH,
};
pub use logs::tips::ForkSummary;
pub use plan::builder::{Plan, PlanBuilder};
pub use plan::command::{Action, CliCall, Command};
pub use plan::scheduler::{Scheduler, TickSummary};
pub use runtime::config::{RunConfig, RunConfigBuilder};
pub use runtime::runner::{RunReport, Runner};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
