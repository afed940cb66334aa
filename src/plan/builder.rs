//! Composes the total ordered command sequence for one run. Setup segments
//! are paired with their release commands at acquisition time; `finish`
//! appends every registered release group in reverse acquisition order, so a
//! plan never leaks acquired resources even when a later segment fails to
//! build.

use crate::plan::command::Command;
use anyhow::Result;

/// The full ordered command sequence for one orchestrated run. Downstream
/// consumers must execute it front to back; no reordering is permitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    commands: Vec<Command>,
}

impl Plan {
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }
}

#[derive(Debug, Default)]
pub struct PlanBuilder {
    commands: Vec<Command>,
    releases: Vec<Vec<Command>>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a setup segment and registers the commands that release it.
    /// Release groups run after everything else, in reverse acquisition
    /// order.
    pub fn acquire(
        &mut self,
        setup: impl IntoIterator<Item = Command>,
        release: impl IntoIterator<Item = Command>,
    ) {
        self.commands.extend(setup);
        self.releases.push(release.into_iter().collect());
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn extend(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.extend(commands);
    }

    /// Runs a fallible population closure and always yields the plan,
    /// teardown included, alongside the closure's outcome. A failed stage
    /// therefore still produces a plan that releases whatever was acquired
    /// before the failure.
    pub fn build<F>(mut self, populate: F) -> (Plan, Result<()>)
    where
        F: FnOnce(&mut PlanBuilder) -> Result<()>,
    {
        let outcome = populate(&mut self);
        (self.finish(), outcome)
    }

    /// Seals the plan: emitted commands first, then release groups in
    /// reverse acquisition order.
    pub fn finish(mut self) -> Plan {
        while let Some(release) = self.releases.pop() {
            self.commands.extend(release);
        }
        Plan {
            commands: self.commands,
        }
    }
}
