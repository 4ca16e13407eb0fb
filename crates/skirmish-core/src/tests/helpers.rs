//! Test helper functions for building creatures and arenas.

use std::sync::Arc;

use lattice::GridBounds;

use crate::action::{Action, DamageTerm};
use crate::arena::Arena;
use crate::creature::{AbilityScores, Creature, CreatureType, Side, Size, Speeds, StatBlock};
use crate::damage::DamageType;
use crate::dice::{DiceFormula, ScriptedDice};
use crate::party::Party;

// =============================================================================
// Creatures
// =============================================================================

/// A plain medium beast with one melee slam: +4 to hit, 3 flat bludgeoning,
/// 30 ft of ground speed and all scores at 10.
pub fn stat_block(name: &str, hp: i32, ac: i32) -> StatBlock {
    StatBlock {
        name: name.to_string(),
        category: CreatureType::Beast,
        size: Size::Medium,
        cr: 1.0,
        ac,
        hp,
        death_threshold: 0,
        speed: Speeds::walking(30),
        scores: AbilityScores::default(),
        saves: Vec::new(),
        resistances: Vec::new(),
        immunities: Vec::new(),
        vulnerabilities: Vec::new(),
        condition_immunities: Vec::new(),
        attacks_per_round: 1,
        actions: vec![Action::melee(
            "Slam",
            4,
            vec![DamageTerm::new(DiceFormula::flat(3), DamageType::Bludgeoning)],
        )],
        passives: Vec::new(),
        stomach: None,
        behavior: None,
    }
}

/// A creature built from [`stat_block`].
pub fn brute(name: &str, hp: i32, ac: i32) -> Creature {
    Creature::new(Arc::new(stat_block(name, hp, ac)))
}

/// Rebuild `creature` from its template with one extra resistance.
pub fn with_resistance(creature: Creature, kind: DamageType) -> Creature {
    let mut block = creature.template().clone();
    block.resistances.push(kind);
    Creature::new(Arc::new(block))
}

// =============================================================================
// Arenas
// =============================================================================

/// Muster "Team A" and "Team B" with every initiative roll at 10, then
/// deploy them 3 cells either side of the origin.
pub fn arena_of(a: Vec<Creature>, b: Vec<Creature>) -> Arena {
    let mut dice = ScriptedDice::new(Vec::<u32>::new()).with_fallback(10);
    let mut team_a = Party::new("Team A", Side::A);
    for creature in a {
        team_a.add(creature, &mut dice);
    }
    let mut team_b = Party::new("Team B", Side::B);
    for creature in b {
        team_b.add(creature, &mut dice);
    }
    let mut arena = Arena::new(team_a, team_b, GridBounds::default());
    arena.deploy(3);
    arena
}
