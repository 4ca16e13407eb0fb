//! End-to-end tests of the turn pipeline.
//!
//! Scripted dice pin every roll, so each scenario checks exact numbers.

use std::sync::Arc;

use lattice::GridPos;

use crate::action::{Action, DamageTerm, SaveSpec};
use crate::arena::Arena;
use crate::bestiary::Bestiary;
use crate::conditions::{ConditionEffect, ConditionKind, ConditionState};
use crate::creature::{Ability, AbilityScores, CombatantId, Creature, Side};
use crate::damage::DamageType;
use crate::dice::{Advantage, DiceFormula, ScriptedDice};
use crate::encounter::{Encounter, EncounterConfig, Outcome};
use crate::narration::NullSink;
use crate::party::Party;
use crate::resolver::{attack_roll, resolve_action, saving_throw};
use crate::turn::TurnContext;

use super::helpers::{arena_of, brute, stat_block, with_resistance};

// =============================================================================
// Helpers
// =============================================================================

fn armed(name: &str, to_hit: i32, dice: DiceFormula, kind: DamageType) -> Creature {
    let mut block = stat_block(name, 30, 12);
    block.actions = vec![Action::melee("Weapon", to_hit, vec![DamageTerm::new(dice, kind)])];
    Creature::new(Arc::new(block))
}

fn strike(arena: &mut Arena, dice: ScriptedDice) -> (CombatantId, CombatantId, i32) {
    let (a, b) = (arena.ids()[0], arena.ids()[1]);
    let config = EncounterConfig::default();
    let mut dice = dice;
    let mut sink = NullSink;
    let mut ctx = TurnContext::new(&mut dice, &mut sink, &config);
    let outcome = resolve_action(arena, &mut ctx, a, b, 0);
    (a, b, outcome.damage)
}

/// Structural invariants that hold between turns.
fn assert_consistent(arena: &Arena) {
    for id in arena.ids() {
        let c = &arena[id];
        let on_grid = arena.grid().position_of(id);
        if c.is_dead() {
            assert_eq!(on_grid, None, "{id} is dead but on the grid");
        } else if c.is_swallowed() {
            assert_eq!(on_grid, None, "{id} is swallowed but on the grid");
            let container = c
                .conditions()
                .get(ConditionKind::Swallowed)
                .and_then(|s| s.source)
                .expect("swallowed without a source");
            assert_eq!(c.position, arena[container].position);
            assert!(arena[container].stomach().contains(&id));
        } else {
            assert_eq!(on_grid, Some(c.position), "{id} strayed from its cell");
        }
        assert!(c.hp <= c.max_hp);
    }
}

// =============================================================================
// Attack Scenarios
// =============================================================================

#[test]
fn ordinary_roll_beats_armor() {
    let attacker = armed("Spearman", 6, DiceFormula::flat(4), DamageType::Piercing);
    let target = brute("Knight", 30, 14);

    let roll = attack_roll(&attacker, &target, 6, Advantage::NORMAL, &mut ScriptedDice::new([15]));
    assert!(roll.hit);
    assert_eq!(roll.total, 21);
    assert_eq!(roll.multiplier, 1);

    let mut arena = arena_of(vec![attacker], vec![target]);
    let (_, b, damage) = strike(&mut arena, ScriptedDice::new([15]));
    assert_eq!(damage, 4);
    assert_eq!(arena[b].hp, 26);
}

#[test]
fn natural_twenty_always_hits_for_double_dice() {
    let attacker = armed("Squire", -5, "1d4".parse().unwrap(), DamageType::Piercing);
    let target = brute("Golem", 30, 30);

    let roll = attack_roll(&attacker, &target, -5, Advantage::NORMAL, &mut ScriptedDice::new([20]));
    assert!(roll.hit);
    assert_eq!(roll.multiplier, 2);

    let mut arena = arena_of(vec![attacker], vec![target]);
    let (a, b, damage) = strike(&mut arena, ScriptedDice::new([20, 3, 4]));
    assert_eq!(damage, 7);
    assert_eq!(arena[b].hp, 23);
    assert_eq!(arena[a].counters.hits, 1);
}

#[test]
fn natural_one_always_misses() {
    let attacker = armed("Champion", 50, DiceFormula::flat(4), DamageType::Slashing);
    let target = brute("Rat", 1, 5);
    let roll = attack_roll(&attacker, &target, 50, Advantage::NORMAL, &mut ScriptedDice::new([1]));
    assert!(!roll.hit);
    assert!(roll.fumbled);
}

#[test]
fn resisted_damage_is_halved_rounding_down() {
    let attacker = armed("Ogre", 4, "2d6".parse().unwrap(), DamageType::Bludgeoning);
    let target = with_resistance(brute("Skeleton", 20, 13), DamageType::Bludgeoning);
    let mut arena = arena_of(vec![attacker], vec![target]);
    let (a, b, damage) = strike(&mut arena, ScriptedDice::new([15, 5, 6]));
    assert_eq!(damage, 5);
    assert_eq!(arena[b].hp, 15);
    assert_eq!(arena[a].counters.damage_dealt, 5);
}

#[test]
fn paralysed_target_is_critically_hit_and_fails_physical_saves() {
    let attacker = armed("Ghoul", 0, DiceFormula::flat(1), DamageType::Slashing);
    let mut target = brute("Guard", 30, 25);
    target.apply_condition(ConditionKind::Paralyzed, ConditionState::default());

    // Paralysis exposes the target, so the d20 is rolled twice.
    let mut dice = ScriptedDice::new([2, 2]);
    let roll = attack_roll(&attacker, &target, 0, Advantage::NORMAL, &mut dice);
    assert!(roll.hit);
    assert_eq!(roll.multiplier, 2);
    assert_eq!(dice.served(), 2);

    let mut no_dice = ScriptedDice::new(Vec::<u32>::new());
    assert!(!saving_throw(&target, Ability::Str, 1, &mut no_dice).success);
    assert!(!saving_throw(&target, Ability::Dex, 1, &mut no_dice).success);
    assert_eq!(no_dice.served(), 0);
}

fn breather() -> Creature {
    let poisoned = ConditionEffect {
        duration: Some(2),
        ..ConditionEffect::plain(ConditionKind::Poisoned)
    };
    let mut block = stat_block("Drake", 30, 13);
    block.actions = vec![Action::melee(
        "Poison Breath",
        0,
        vec![DamageTerm::new("2d6".parse().unwrap(), DamageType::Poison)],
    )
    .without_attack_roll()
    .with_save(SaveSpec::half(Ability::Con, 13).with_on_fail(poisoned))];
    Creature::new(Arc::new(block))
}

#[test]
fn saved_breath_deals_half_and_inflicts_nothing() {
    let mut arena = arena_of(vec![breather()], vec![brute("Guard", 30, 16)]);
    // Con save 15 against DC 13, then 4 + 6 on the damage dice.
    let (_, b, damage) = strike(&mut arena, ScriptedDice::new([15, 4, 6]));
    assert_eq!(damage, 5);
    assert_eq!(arena[b].hp, 25);
    assert!(!arena[b].has(ConditionKind::Poisoned));
}

#[test]
fn failed_breath_save_deals_full_damage_and_its_condition() {
    let mut arena = arena_of(vec![breather()], vec![brute("Guard", 30, 16)]);
    let (a, b, damage) = strike(&mut arena, ScriptedDice::new([5, 4, 6]));
    assert_eq!(damage, 10);
    assert_eq!(arena[b].hp, 20);
    let state = arena[b].conditions().get(ConditionKind::Poisoned).copied();
    assert_eq!(state.and_then(|s| s.duration), Some(2));
    assert_eq!(state.and_then(|s| s.source), Some(a));
}

#[test]
fn fumble_knocks_the_attacker_prone_and_hurts_it() {
    let attacker = armed("Berserker", 5, DiceFormula::flat(4), DamageType::Slashing);
    let mut arena = arena_of(vec![attacker], vec![brute("Knight", 30, 14)]);
    // Natural 1, then 1 on the d3, then 4 on the 1d6 of self-inflicted damage.
    let (a, b, damage) = strike(&mut arena, ScriptedDice::new([1, 1, 4]));
    assert_eq!(damage, 0);
    assert_eq!(arena[b].hp, 30);
    assert_eq!(arena[a].hp, 26);
    assert!(arena[a].has(ConditionKind::Prone));
    assert_eq!(arena[a].counters.misses, 1);
}

#[test]
fn fumble_without_a_one_on_the_d3_is_a_plain_miss() {
    let attacker = armed("Berserker", 5, DiceFormula::flat(4), DamageType::Slashing);
    let mut arena = arena_of(vec![attacker], vec![brute("Knight", 30, 14)]);
    let (a, _, damage) = strike(&mut arena, ScriptedDice::new([1, 2]));
    assert_eq!(damage, 0);
    assert_eq!(arena[a].hp, 30);
    assert!(!arena[a].has(ConditionKind::Prone));
}

// =============================================================================
// Scheduling Scenarios
// =============================================================================

#[test]
fn initiative_ties_break_on_dexterity_then_rating() {
    let creature = |name: &str, dex: i32, cr: f32| {
        let mut block = stat_block(name, 10, 10);
        block.scores = AbilityScores::new(10, dex, 10, 10, 10, 10);
        block.cr = cr;
        Creature::new(Arc::new(block))
    };
    // Dex 12 and 13 share a +1 modifier, so every roll totals 11.
    let arena = arena_of(
        vec![creature("Scout", 12, 1.0), creature("Veteran", 13, 3.0)],
        vec![creature("Bandit", 13, 0.125), creature("Thug", 12, 0.5)],
    );
    let names: Vec<&str> = arena.turn_order().into_iter().map(|id| arena[id].name()).collect();
    assert_eq!(names, ["Veteran", "Bandit", "Scout", "Thug"]);

    let again: Vec<&str> = arena.turn_order().into_iter().map(|id| arena[id].name()).collect();
    assert_eq!(names, again);
}

#[test]
fn last_death_ends_the_round_at_once() {
    let mut dice = ScriptedDice::new([15, 2, 5]).with_fallback(19);
    let a = Party::muster(
        "Ogres",
        Side::A,
        [brute("Ogre", 59, 11), brute("Goblin", 7, 15)],
        &mut dice,
    )
    .unwrap();
    let mut kobold = brute("Kobold", 5, 12);
    kobold.hp = 1;
    let b = Party::muster("Kobolds", Side::B, [kobold], &mut dice).unwrap();

    let mut encounter = Encounter::new(a, b, EncounterConfig::default(), Box::new(dice)).unwrap();
    let ids = encounter.arena().ids();
    let (ogre, goblin, kobold) = (ids[0], ids[1], ids[2]);
    let beside = encounter.arena()[ogre].position - GridPos::Y;
    encounter.arena_mut().grid_mut().relocate(kobold, beside).unwrap();
    encounter.arena_mut()[kobold].position = beside;

    let outcome = encounter.step_round();
    assert_eq!(
        outcome,
        Some(Outcome::Winner {
            side: Side::A,
            party: "Ogres".to_string()
        })
    );
    let arena = encounter.arena();
    assert!(!arena.party(Side::B).is_alive());
    assert_eq!(arena[goblin].counters.turns_survived, 0);
    assert_eq!(arena[kobold].counters.turns_survived, 0);
    assert_eq!(arena.grid().position_of(kobold), None);
}

// =============================================================================
// Whole Encounters
// =============================================================================

#[test]
fn invariants_hold_between_every_round() {
    let bestiary = Bestiary::builtin();
    let pairings: [(&[&str], &[&str]); 4] = [
        (&["giant toad", "giant toad"], &["goblin", "goblin", "kobold"]),
        (&["ghoul", "ghoul"], &["wolf", "wolf", "wolf"]),
        (&["minotaur"], &["skeleton", "zombie", "skeleton"]),
        (&["giant spider", "crocodile"], &["mummy"]),
    ];
    for (seed, (a, b)) in pairings.into_iter().enumerate() {
        let mut encounter = Encounter::seeded(
            ("A", bestiary.spawn_all(a).unwrap()),
            ("B", bestiary.spawn_all(b).unwrap()),
            EncounterConfig::default(),
            seed as u64,
        )
        .unwrap();
        assert_consistent(encounter.arena());
        while encounter.step_round().is_none() {
            assert_consistent(encounter.arena());
        }
        assert_consistent(encounter.arena());
    }
}

#[test]
fn every_builtin_creature_finishes_a_duel() {
    let bestiary = Bestiary::builtin();
    let names = bestiary.names();
    for (i, &name) in names.iter().enumerate() {
        let rival = names[(i + 1) % names.len()];
        let mut encounter = Encounter::seeded(
            (name, vec![bestiary.spawn(name).unwrap()]),
            (rival, vec![bestiary.spawn(rival).unwrap()]),
            EncounterConfig::default(),
            i as u64,
        )
        .unwrap();
        let outcome = encounter.run();
        assert!(encounter.round() <= 100, "{name} vs {rival} overran");
        if let Outcome::Winner { side, .. } = outcome {
            assert!(encounter.arena().party(side).is_alive());
            assert!(!encounter.arena().party(side.opponent()).is_alive());
        }
    }
}

#[test]
fn every_death_is_credited() {
    let bestiary = Bestiary::builtin();
    let report = Encounter::seeded(
        ("Giants", vec![bestiary.spawn("stone giant").unwrap()]),
        ("Kobolds", bestiary.spawn_all(&["kobold", "kobold"]).unwrap()),
        EncounterConfig::default(),
        5,
    )
    .unwrap()
    .finish();
    let everyone = || report.parties.iter().flat_map(Party::members);
    let deaths: u32 = everyone().map(|c| c.counters.deaths).sum();
    let credited: u32 = everyone().map(|c| c.counters.kills + c.counters.suicides).sum();
    assert_eq!(deaths, credited);
    if report.outcome.winner() == Some("Kobolds") {
        assert_eq!(report.parties[Side::A.index()].members()[0].counters.deaths, 1);
    } else if report.outcome.winner() == Some("Giants") {
        assert!(report.parties[Side::B.index()].members().iter().all(Creature::is_dead));
    }
}
