//! Assigns pending actions to discrete time slots and renders them as an
//! ordered command sequence. Slot placement is uniformly random through an
//! explicitly passed RNG so runs are reproducible under a fixed seed; the
//! randomized interleaving simulates naturally staggered network activity
//! rather than lock-step rounds.

use crate::plan::command::{Action, Command};
use rand::Rng;

/// Per-tick action counts, used for the tick-info artifact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: usize,
    pub blocks: usize,
    pub transactions: usize,
}

/// Maps time slots to ordered action buckets, independently for block and
/// transaction actions. The two kinds keep independently sized slot ranges,
/// so they only share a tick numbering when the caller sizes them equally.
#[derive(Debug, Default)]
pub struct Scheduler {
    block_slots: Vec<Vec<Action>>,
    tx_slots: Vec<Vec<Action>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns every action to a uniformly random slot in `[0, slots)`,
    /// sampling with replacement, so collisions are expected. A `slots` of
    /// zero degenerates to an empty schedule for this kind.
    pub fn add_block_actions<R: Rng + ?Sized>(
        &mut self,
        slots: usize,
        actions: Vec<Action>,
        rng: &mut R,
    ) {
        assign(&mut self.block_slots, slots, actions, rng);
    }

    /// Same slot assignment as [`Scheduler::add_block_actions`], over the
    /// transaction slot range.
    pub fn add_transaction_actions<R: Rng + ?Sized>(
        &mut self,
        slots: usize,
        actions: Vec<Action>,
        rng: &mut R,
    ) {
        assign(&mut self.tx_slots, slots, actions, rng);
    }

    /// Number of ticks `render` will emit.
    pub fn tick_count(&self) -> usize {
        self.block_slots.len().max(self.tx_slots.len())
    }

    /// Renders the plan fragment: for each tick a boundary marker followed by
    /// that tick's block actions then transaction actions, each kind in
    /// insertion order. Empty ticks render the marker alone.
    pub fn render(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        for tick in 0..self.tick_count() {
            commands.push(Command::TickMarker { tick });
            for action in self.bucket(&self.block_slots, tick) {
                commands.push(action.clone().into_command());
            }
            for action in self.bucket(&self.tx_slots, tick) {
                commands.push(action.clone().into_command());
            }
        }
        commands
    }

    pub fn summaries(&self) -> Vec<TickSummary> {
        (0..self.tick_count())
            .map(|tick| TickSummary {
                tick,
                blocks: self.bucket(&self.block_slots, tick).len(),
                transactions: self.bucket(&self.tx_slots, tick).len(),
            })
            .collect()
    }

    fn bucket<'a>(&self, slots: &'a [Vec<Action>], tick: usize) -> &'a [Action] {
        slots.get(tick).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn assign<R: Rng + ?Sized>(
    buckets: &mut Vec<Vec<Action>>,
    slots: usize,
    actions: Vec<Action>,
    rng: &mut R,
) {
    if slots == 0 {
        return;
    }
    if buckets.len() < slots {
        buckets.resize_with(slots, Vec::new);
    }
    for action in actions {
        let slot = rng.gen_range(0..slots);
        buckets[slot].push(action);
    }
}
