//! Sequential plan issuance. Commands run front to back in plan order; a
//! failing command is recorded and the run continues, so one refused docker
//! call never halts the whole experiment. The collected report restores the
//! visibility that fire-and-forget execution would lose.

use crate::cluster::docker;
use crate::exec::executor::CommandExecutor;
use crate::plan::builder::Plan;
use crate::runtime::telemetry::Telemetry;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;

/// One command that failed during issuance.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    /// Position of the command in the plan.
    pub index: usize,
    pub rendered: String,
    pub error: String,
}

/// Outcome of driving one plan to completion.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub attempted: usize,
    pub failures: Vec<CommandFailure>,
}

impl ExecutionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Issues every command of `plan` in order through `executor`, collecting
/// per-command failures into the returned report.
pub async fn drive_plan(
    executor: &dyn CommandExecutor,
    plan: &Plan,
    telemetry: &Telemetry,
) -> ExecutionReport {
    let bar = build_progress_bar(plan.len() as u64);
    let mut report = ExecutionReport::default();

    for (index, command) in plan.iter().enumerate() {
        bar.set_message(docker::render(command));
        report.attempted += 1;
        telemetry.record_command_issued();

        if let Err(err) = executor.run(command).await {
            telemetry.record_command_failure();
            let failure = CommandFailure {
                index,
                rendered: docker::render(command),
                error: format!("{err:#}"),
            };
            tracing::warn!(
                index,
                command = %failure.rendered,
                error = %failure.error,
                "command failed; continuing with the rest of the plan"
            );
            report.failures.push(failure);
        }
        bar.inc(1);
    }

    bar.finish_and_clear();
    report
}

fn build_progress_bar(length: u64) -> ProgressBar {
    let target = if std::io::stdout().is_terminal() {
        ProgressDrawTarget::stdout_with_hz(12)
    } else {
        ProgressDrawTarget::hidden()
    };
    let bar = ProgressBar::with_draw_target(Some(length), target);
    let style = ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} {wide_msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}
