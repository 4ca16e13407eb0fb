//! Determinism verification tests.
//!
//! An encounter is a pure function of its rosters, its rules and its seed:
//! - The same seed always ends in the same state hash
//! - Narration does not feed back into the fight
//! - Property checks hold for arbitrary seeds and inputs

use proptest::prelude::*;

use crate::bestiary::Bestiary;
use crate::conditions::{ConditionKind, ConditionState};
use crate::creature::Creature;
use crate::encounter::{Encounter, EncounterConfig, EncounterReport, Outcome};
use crate::narration::{RecordingSink, Severity};

use super::helpers::brute;

fn skirmish(seed: u64) -> Encounter {
    let bestiary = Bestiary::builtin();
    Encounter::seeded(
        ("Pack", bestiary.spawn_all(&["wolf", "wolf", "wolf"]).unwrap()),
        ("Warband", bestiary.spawn_all(&["goblin", "goblin", "ogre"]).unwrap()),
        EncounterConfig::default(),
        seed,
    )
    .unwrap()
}

fn fingerprint(report: &EncounterReport) -> (Outcome, u32, u64) {
    (report.outcome.clone(), report.rounds, report.state_hash)
}

// =============================================================================
// Replays
// =============================================================================

#[test]
fn same_seed_same_fight() {
    for seed in [0, 1, 42, 9_999] {
        let first = skirmish(seed).finish();
        let second = skirmish(seed).finish();
        assert_eq!(fingerprint(&first), fingerprint(&second), "seed {seed} diverged");
    }
}

#[test]
fn round_by_round_hashes_match() {
    let mut a = skirmish(77);
    let mut b = skirmish(77);
    assert_eq!(a.arena().state_hash(), b.arena().state_hash());
    loop {
        let (oa, ob) = (a.step_round(), b.step_round());
        assert_eq!(oa, ob);
        assert_eq!(a.arena().state_hash(), b.arena().state_hash());
        if oa.is_some() {
            break;
        }
    }
}

#[test]
fn different_seeds_diverge() {
    let hashes: std::collections::BTreeSet<u64> =
        (0..8).map(|seed| skirmish(seed).finish().state_hash).collect();
    assert!(hashes.len() > 1);
}

#[test]
fn narration_does_not_change_the_outcome() {
    let quiet = skirmish(31).finish();
    let sink = RecordingSink::new(Severity::Grid);
    let loud = skirmish(31).with_sink(Box::new(sink.clone())).finish();
    assert_eq!(fingerprint(&quiet), fingerprint(&loud));
    assert!(!sink.lines().is_empty());
}

#[test]
fn hash_sees_hit_points() {
    let mut encounter = skirmish(3);
    let before = encounter.arena().state_hash();
    let id = encounter.arena().ids()[0];
    encounter.arena_mut()[id].hp -= 1;
    assert_ne!(before, encounter.arena().state_hash());
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn encounters_end_within_the_round_cap(seed in any::<u64>()) {
        let mut encounter = skirmish(seed);
        let outcome = encounter.run();
        prop_assert!(encounter.round() <= encounter.config().round_cap);
        if let Outcome::Winner { side, .. } = outcome {
            prop_assert!(encounter.arena().party(side).is_alive());
        }
    }

    #[test]
    fn death_tracks_the_threshold(hp in -20i32..20, threshold in -5i32..=0) {
        let mut block = super::helpers::stat_block("Troll", 40, 15);
        block.death_threshold = threshold;
        let mut troll = Creature::new(std::sync::Arc::new(block));
        troll.hp = hp;
        prop_assert_eq!(troll.is_dead(), hp <= threshold);
    }

    #[test]
    fn immune_conditions_never_stick(
        attempts in 1usize..6,
        kind_index in 0usize..ConditionKind::ALL.len(),
    ) {
        let kind = ConditionKind::ALL[kind_index];
        let mut block = super::helpers::stat_block("Skeleton", 13, 13);
        block.condition_immunities = vec![kind];
        let mut skeleton = Creature::new(std::sync::Arc::new(block));
        for _ in 0..attempts {
            prop_assert!(!skeleton.apply_condition(kind, ConditionState::default()));
            prop_assert!(!skeleton.has(kind));
        }
        let other = ConditionKind::ALL[(kind_index + 1) % ConditionKind::ALL.len()];
        prop_assert!(brute("Goblin", 7, 15).apply_condition(other, ConditionState::default()));
    }
}
