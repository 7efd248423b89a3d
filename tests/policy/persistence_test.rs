//! Tests for policy persistence: load-if-present, fresh-start fallback,
//! and learning carried across a save/load cycle.

use prowl::env::Observation;
use prowl::policy::{Policy, QLearningPolicy};

fn obs(step: u32) -> Observation {
    Observation {
        step,
        max_steps: 10,
    }
}

#[test]
fn missing_file_starts_a_fresh_policy() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("qtable.json");

    let mut policy = QLearningPolicy::load_or_new(&path, 10, Some(3));
    policy.set_greedy(true);
    // A fresh table is indifferent; the greedy tie-break is the first action.
    assert_eq!(policy.predict(&obs(0)), 0);
}

#[test]
fn corrupt_file_falls_back_to_a_fresh_policy() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("qtable.json");
    std::fs::write(&path, "{ not json").expect("write corrupt file");

    let mut policy = QLearningPolicy::load_or_new(&path, 10, Some(3));
    policy.set_greedy(true);
    assert_eq!(policy.predict(&obs(0)), 0);
}

#[test]
fn learning_survives_a_save_and_reload() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("models").join("qtable.json");

    let mut policy = QLearningPolicy::new(10, Some(3));
    for _ in 0..20 {
        policy.record(&obs(2), 4, 5.0, true);
    }
    // Save creates the missing parent directory.
    policy.save(&path).expect("save policy");

    let mut restored = QLearningPolicy::load_or_new(&path, 10, Some(3));
    restored.set_greedy(true);
    assert_eq!(restored.predict(&obs(2)), 4);
}

#[test]
fn budget_change_invalidates_the_persisted_table() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("qtable.json");

    let policy = QLearningPolicy::new(10, Some(3));
    policy.save(&path).expect("save policy");

    // A different step budget reshapes the state space; the stale table is
    // discarded rather than silently misindexed.
    let mut reloaded = QLearningPolicy::load_or_new(&path, 50, Some(3));
    reloaded.set_greedy(true);
    assert_eq!(reloaded.predict(&obs(0)), 0);
}
