use crate::support::helpers::init_tracing;
use forklab::{Action, CliCall, Command, NodeId, PlanBuilder, Scheduler};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

fn node(name: &str) -> NodeId {
    NodeId::new(name).unwrap()
}

#[test]
fn rendered_fragment_contains_each_action_exactly_once() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(17);
    let mut scheduler = Scheduler::new();

    // Distinct block counts make every action distinguishable in the output.
    let actions: Vec<Action> = (0..50)
        .map(|index| Action::generate(node("fl-0"), index + 1))
        .collect();
    scheduler.add_block_actions(7, actions, &mut rng);

    let rendered = scheduler.render();
    for wanted in 1..=50u32 {
        let occurrences = rendered
            .iter()
            .filter(|command| {
                matches!(command, Command::Cli { call: CliCall::Generate { blocks }, .. }
                    if *blocks == wanted)
            })
            .count();
        assert_eq!(occurrences, 1, "action generate({wanted}) must appear once");
    }
}

#[test]
fn single_slot_scenario_lands_everything_in_tick_zero() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut scheduler = Scheduler::new();
    let actions = vec![
        Action::generate(node("a"), 1),
        Action::generate(node("b"), 1),
        Action::generate(node("c"), 1),
    ];
    scheduler.add_block_actions(1, actions, &mut rng);

    let rendered = scheduler.render();
    assert_eq!(rendered.len(), 4, "one marker plus three actions");
    assert_eq!(rendered[0], Command::TickMarker { tick: 0 });
    let order: Vec<&str> = rendered[1..]
        .iter()
        .map(|command| match command {
            Command::Cli { node, .. } => node.as_str(),
            other => panic!("unexpected command {other:?}"),
        })
        .collect();
    assert_eq!(order, ["a", "b", "c"]);
}

#[test]
fn slot_assignment_is_uniform_under_chi_square() {
    // Deterministic under the fixed seed; the statistic checks i.i.d.
    // uniformity of slot placement across a large sample.
    let slots = 8;
    let samples = 4000;
    let mut rng = StdRng::seed_from_u64(1234);
    let mut scheduler = Scheduler::new();
    let actions: Vec<Action> = (0..samples)
        .map(|_| Action::generate(node("fl-0"), 1))
        .collect();
    scheduler.add_block_actions(slots, actions, &mut rng);

    let expected = samples as f64 / slots as f64;
    let chi_square: f64 = scheduler
        .summaries()
        .iter()
        .map(|summary| {
            let observed = summary.blocks as f64;
            (observed - expected).powi(2) / expected
        })
        .sum();

    // Critical value for df = 7 at p = 0.0005.
    assert!(
        chi_square < 26.02,
        "slot placement deviates from uniform: chi^2 = {chi_square}"
    );
}

#[test]
fn block_and_transaction_ranges_are_independent() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut scheduler = Scheduler::new();
    scheduler.add_block_actions(2, vec![Action::generate(node("a"), 1); 4], &mut rng);
    scheduler.add_transaction_actions(
        6,
        vec![Action::send_to_self(node("b"), "10.0"); 4],
        &mut rng,
    );

    // Ticks beyond the block range still render, carrying only transactions.
    assert_eq!(scheduler.tick_count(), 6);
    let markers = scheduler
        .render()
        .iter()
        .filter(|command| matches!(command, Command::TickMarker { .. }))
        .count();
    assert_eq!(markers, 6);
}

#[test]
fn plan_length_is_exactly_the_sum_of_its_segments() {
    let setup = vec![
        Command::CreateNetwork {
            name: "net".into(),
            subnet: "240.0.0.0/4".into(),
        },
        Command::Settle {
            duration: Duration::from_secs(1),
        },
    ];
    let teardown = vec![Command::RemoveNetwork { name: "net".into() }];

    let mut rng = StdRng::seed_from_u64(2);
    let mut scheduler = Scheduler::new();
    scheduler.add_block_actions(3, vec![Action::generate(node("a"), 1); 10], &mut rng);
    let fragment = scheduler.render();
    let fragment_len = fragment.len();

    let mut builder = PlanBuilder::new();
    builder.acquire(setup.clone(), teardown.clone());
    builder.extend(fragment);
    let plan = builder.finish();

    assert_eq!(plan.len(), setup.len() + fragment_len + teardown.len());
    // Segment order survives: setup first, fragment in the middle, teardown
    // last.
    assert_eq!(plan.commands()[0], setup[0]);
    assert_eq!(
        plan.commands()[plan.len() - 1],
        teardown[0],
        "teardown must close the plan"
    );
}

#[test]
fn teardown_survives_a_failed_setup_stage() {
    let (plan, outcome) = PlanBuilder::new().build(|builder| {
        builder.acquire(
            [Command::CreateNetwork {
                name: "net".into(),
                subnet: "240.0.0.0/4".into(),
            }],
            [Command::RemoveNetwork { name: "net".into() }],
        );
        anyhow::bail!("node provisioning refused before any node was added");
    });

    assert!(outcome.is_err());
    assert!(
        plan.commands()
            .iter()
            .any(|command| matches!(command, Command::RemoveNetwork { .. })),
        "bootstrap teardown must still be present"
    );
}
