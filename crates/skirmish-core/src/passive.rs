//! Passive abilities.
//!
//! Passives are a closed set of effects, each tagged with the turn phase that
//! evaluates it. The scheduler and resolver match on [`Passive`] directly;
//! there is no open-ended registry.
//!
//! | Passive              | Phase       |
//! |----------------------|-------------|
//! | `PackTactics`        | Initial     |
//! | `Regeneration`       | OnStart     |
//! | `ExtraDamageOnHit`   | OnHit       |
//! | `HitAndRun`          | AtEnd       |
//! | `AvoidDeath`         | OnDeath     |

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::DamageTerm;
use crate::arena::Arena;
use crate::conditions::RollKind;
use crate::creature::{Ability, CombatantId};
use crate::damage::{DamageType, DamageTypes};
use crate::dice::Advantage;
use crate::movement;
use crate::narration::Severity;
use crate::resolver::saving_throw;
use crate::turn::TurnContext;

/// When a passive is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerPhase {
    /// First thing in the creature's turn, even if it cannot act
    Initial,
    /// Before attacking, if the creature can act
    OnStart,
    /// When one of the creature's attacks hits
    OnHit,
    /// After attacking, if the creature can act
    AtEnd,
    /// When the creature would die
    OnDeath,
}

/// A passive ability and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "passive", rename_all = "snake_case")]
pub enum Passive {
    /// Advantage on attacks while another creature of the same kind fights on.
    PackTactics,
    /// Heal at the start of each turn unless hurt by a suppressing type.
    Regeneration {
        /// HP restored
        hp: i32,
        /// Damage types that stop regeneration for a turn
        #[serde(default)]
        suppressed_by: Vec<DamageType>,
    },
    /// Extra damage on a hit.
    ExtraDamageOnHit {
        /// Display name
        name: String,
        /// Damage added
        term: DamageTerm,
        /// Only the first hit each turn benefits
        #[serde(default)]
        once_per_turn: bool,
    },
    /// Spend leftover movement backing away from the focused enemy, staying in reach.
    HitAndRun,
    /// Drop to `min_hp` instead of dying.
    AvoidDeath {
        /// Display name
        #[serde(default)]
        name: String,
        /// HP left after a successful veto
        #[serde(default = "one")]
        min_hp: i32,
        /// Hits with a critical multiplier above this kill outright
        #[serde(default = "one_u32")]
        kill_multiplier: u32,
        /// Damage types that kill outright
        #[serde(default)]
        bypass: Vec<DamageType>,
        /// Save required, DC 5 + damage taken
        #[serde(default)]
        save: Option<Ability>,
    },
}

const fn one() -> i32 {
    1
}

const fn one_u32() -> u32 {
    1
}

impl Passive {
    /// The phase that evaluates this passive.
    #[must_use]
    pub const fn phase(&self) -> TriggerPhase {
        match self {
            Self::PackTactics => TriggerPhase::Initial,
            Self::Regeneration { .. } => TriggerPhase::OnStart,
            Self::ExtraDamageOnHit { .. } => TriggerPhase::OnHit,
            Self::HitAndRun => TriggerPhase::AtEnd,
            Self::AvoidDeath { .. } => TriggerPhase::OnDeath,
        }
    }
}

// =============================================================================
// Phase Runners
// =============================================================================

/// Initial-phase passives. Recomputes passive advantage from scratch.
pub fn run_initial(arena: &mut Arena, ctx: &mut TurnContext<'_>, id: CombatantId) {
    arena[id].reset_passive_advantage();
    let template = arena[id].template_arc();
    for passive in template.passives.iter().filter(|p| p.phase() == TriggerPhase::Initial) {
        if let Passive::PackTactics = passive {
            if arena.has_living_kin(id) {
                arena[id].grant_passive_advantage(RollKind::Hit, Advantage::ADVANTAGE);
                let name = arena[id].name().to_string();
                ctx.narrate(Severity::Action, || format!("{name} fights with its pack."));
            }
        }
    }
}

/// On-start passives.
pub fn run_on_start(arena: &mut Arena, ctx: &mut TurnContext<'_>, id: CombatantId) {
    let template = arena[id].template_arc();
    for passive in template.passives.iter().filter(|p| p.phase() == TriggerPhase::OnStart) {
        if let Passive::Regeneration { hp, suppressed_by } = passive {
            let suppress: DamageTypes = suppressed_by.iter().copied().collect();
            let creature = &mut arena[id];
            let name = creature.name().to_string();
            if creature.damage_taken_types().intersects(suppress) {
                ctx.narrate(Severity::Action, || format!("{name} cannot regenerate."));
                continue;
            }
            let healed = creature.heal(*hp);
            if healed > 0 {
                let now = creature.hp;
                ctx.narrate(Severity::Action, || {
                    format!("{name} regenerates {healed} HP ({now} HP).")
                });
            }
        }
    }
}

/// At-end passives.
pub fn run_at_end(arena: &mut Arena, ctx: &mut TurnContext<'_>, id: CombatantId) {
    let template = arena[id].template_arc();
    for passive in template.passives.iter().filter(|p| p.phase() == TriggerPhase::AtEnd) {
        if let Passive::HitAndRun = passive {
            let Some(threat) = arena[id].focus.filter(|t| arena[*t].is_targetable()) else {
                continue;
            };
            if arena[id].movement() > 0 && arena.enemy_adjacent(id) {
                let reach = arena[id].max_reach();
                movement::keep_distance(arena, ctx, id, threat, reach);
            }
        }
    }
}

/// Extra damage terms granted by on-hit passives for the current hit.
///
/// Marks once-per-turn bonuses as spent.
pub fn on_hit_terms(arena: &mut Arena, id: CombatantId) -> Vec<(String, DamageTerm)> {
    let template = arena[id].template_arc();
    let mut terms = Vec::new();
    for passive in &template.passives {
        if let Passive::ExtraDamageOnHit {
            name,
            term,
            once_per_turn,
        } = passive
        {
            if *once_per_turn {
                if arena[id].on_hit_bonus_spent() {
                    continue;
                }
                arena[id].spend_on_hit_bonus();
            }
            terms.push((name.clone(), *term));
        }
    }
    terms
}

/// Consult avoid-death passives for a creature about to die.
///
/// Returns true if one of them vetoed the death, in which case the creature's
/// HP has been set to that passive's floor.
pub fn avoid_death(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    id: CombatantId,
    damage: i32,
    multiplier: u32,
    kinds: DamageTypes,
) -> bool {
    let template = arena[id].template_arc();
    for passive in &template.passives {
        let Passive::AvoidDeath {
            name,
            min_hp,
            kill_multiplier,
            bypass,
            save,
        } = passive
        else {
            continue;
        };
        let bypass: DamageTypes = bypass.iter().copied().collect();
        if multiplier > *kill_multiplier || kinds.intersects(bypass) {
            continue;
        }
        if let Some(ability) = save {
            let dc = 5 + damage;
            let outcome = saving_throw(&arena[id], *ability, dc, ctx.rng);
            if !outcome.success {
                continue;
            }
        }
        let creature = &mut arena[id];
        creature.hp = *min_hp;
        let who = creature.name().to_string();
        debug!(creature = %who, passive = %name, "death avoided");
        ctx.narrate_detail(Severity::Action, || {
            format!("{who} refuses to die ({name})!")
        });
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases() {
        assert_eq!(Passive::PackTactics.phase(), TriggerPhase::Initial);
        assert_eq!(Passive::HitAndRun.phase(), TriggerPhase::AtEnd);
        assert_eq!(
            Passive::Regeneration {
                hp: 10,
                suppressed_by: vec![]
            }
            .phase(),
            TriggerPhase::OnStart
        );
    }

    #[test]
    fn avoid_death_defaults() {
        let p: Passive = serde_json::from_str(
            r#"{"passive":"avoid_death","name":"Undead Fortitude","bypass":["radiant"],"save":"con"}"#,
        )
        .unwrap();
        let Passive::AvoidDeath {
            min_hp,
            kill_multiplier,
            bypass,
            save,
            ..
        } = p
        else {
            panic!("wrong variant");
        };
        assert_eq!(min_hp, 1);
        assert_eq!(kill_multiplier, 1);
        assert_eq!(bypass, vec![DamageType::Radiant]);
        assert_eq!(save, Some(Ability::Con));
    }

    #[test]
    fn tagged_variants_parse() {
        let p: Vec<Passive> = serde_json::from_str(
            r#"[{"passive":"pack_tactics"},{"passive":"hit_and_run"},
                {"passive":"regeneration","hp":10,"suppressed_by":["fire","acid"]}]"#,
        )
        .unwrap();
        assert_eq!(p[0], Passive::PackTactics);
        assert_eq!(p[1], Passive::HitAndRun);
        assert!(matches!(p[2], Passive::Regeneration { hp: 10, .. }));
    }

    mod avoid_death_tests {
        use std::sync::Arc;

        use super::*;
        use crate::creature::Creature;
        use crate::dice::ScriptedDice;
        use crate::encounter::EncounterConfig;
        use crate::narration::NullSink;
        use crate::resolver::{apply_damage, DamagePart};
        use crate::tests::helpers::{arena_of, brute, stat_block};

        fn zombie(save: Option<Ability>) -> Creature {
            let mut block = stat_block("Zombie", 22, 8);
            block.passives = vec![Passive::AvoidDeath {
                name: "Undead Fortitude".to_string(),
                min_hp: 1,
                kill_multiplier: 1,
                bypass: vec![DamageType::Radiant],
                save,
            }];
            Creature::new(Arc::new(block))
        }

        fn dying(save: Option<Ability>) -> (Arena, CombatantId) {
            let mut arena = arena_of(vec![zombie(save)], vec![brute("Cleric", 20, 16)]);
            let id = arena.ids()[0];
            arena[id].hp = -3;
            (arena, id)
        }

        fn consult(
            arena: &mut Arena,
            id: CombatantId,
            dice: &mut ScriptedDice,
            multiplier: u32,
            kind: DamageType,
        ) -> bool {
            let config = EncounterConfig::default();
            let mut sink = NullSink;
            let mut ctx = TurnContext::new(dice, &mut sink, &config);
            avoid_death(arena, &mut ctx, id, 8, multiplier, kind.flag())
        }

        #[test]
        fn ordinary_hit_is_vetoed_to_min_hp() {
            let (mut arena, id) = dying(None);
            let mut dice = ScriptedDice::new(Vec::<u32>::new());
            assert!(consult(&mut arena, id, &mut dice, 1, DamageType::Slashing));
            assert_eq!(arena[id].hp, 1);
        }

        #[test]
        fn critical_above_kill_multiplier_kills() {
            let (mut arena, id) = dying(Some(Ability::Con));
            let mut dice = ScriptedDice::new(Vec::<u32>::new());
            assert!(!consult(&mut arena, id, &mut dice, 2, DamageType::Slashing));
            assert_eq!(arena[id].hp, -3);
            assert_eq!(dice.served(), 0);
        }

        #[test]
        fn bypass_type_kills() {
            let (mut arena, id) = dying(Some(Ability::Con));
            let mut dice = ScriptedDice::new(Vec::<u32>::new());
            assert!(!consult(&mut arena, id, &mut dice, 1, DamageType::Radiant));
            assert_eq!(arena[id].hp, -3);
            assert_eq!(dice.served(), 0);
        }

        #[test]
        fn save_dc_is_five_plus_damage() {
            let (mut arena, id) = dying(Some(Ability::Con));
            let mut dice = ScriptedDice::new([12]);
            assert!(!consult(&mut arena, id, &mut dice, 1, DamageType::Slashing));
            assert_eq!(arena[id].hp, -3);

            let mut dice = ScriptedDice::new([13]);
            assert!(consult(&mut arena, id, &mut dice, 1, DamageType::Slashing));
            assert_eq!(arena[id].hp, 1);
        }

        #[test]
        fn vetoed_death_leaves_the_creature_standing() {
            let mut arena =
                arena_of(vec![zombie(Some(Ability::Con))], vec![brute("Cleric", 20, 16)]);
            let (zombie, cleric) = (arena.ids()[0], arena.ids()[1]);
            arena[zombie].hp = 5;
            let config = EncounterConfig::default();
            let mut dice = ScriptedDice::new([15]);
            let mut sink = NullSink;
            let mut ctx = TurnContext::new(&mut dice, &mut sink, &config);
            let parts = [DamagePart::new(8, DamageType::Bludgeoning)];
            let report = apply_damage(&mut arena, &mut ctx, Some(cleric), zombie, &parts, 1);
            assert!(report.averted);
            assert!(!report.killed);
            assert_eq!(arena[zombie].hp, 1);
            assert_eq!(arena.grid().position_of(zombie), Some(arena[zombie].position));
            assert_eq!(arena[cleric].counters.kills, 0);
        }
    }

    mod regeneration_tests {
        use std::sync::Arc;

        use super::*;
        use crate::creature::Creature;
        use crate::dice::ScriptedDice;
        use crate::encounter::EncounterConfig;
        use crate::narration::NullSink;
        use crate::tests::helpers::{arena_of, brute, stat_block};

        fn troll_arena() -> (Arena, CombatantId) {
            let mut block = stat_block("Troll", 40, 15);
            block.passives = vec![Passive::Regeneration {
                hp: 10,
                suppressed_by: vec![DamageType::Fire, DamageType::Acid],
            }];
            let troll = Creature::new(Arc::new(block));
            let arena = arena_of(vec![troll], vec![brute("Mage", 20, 12)]);
            let id = arena.ids()[0];
            (arena, id)
        }

        fn start(arena: &mut Arena, id: CombatantId) {
            let config = EncounterConfig::default();
            let mut dice = ScriptedDice::new(Vec::<u32>::new());
            let mut sink = NullSink;
            let mut ctx = TurnContext::new(&mut dice, &mut sink, &config);
            run_on_start(arena, &mut ctx, id);
        }

        #[test]
        fn heals_up_to_the_maximum() {
            let (mut arena, troll) = troll_arena();
            arena[troll].hp = 20;
            start(&mut arena, troll);
            assert_eq!(arena[troll].hp, 30);
            arena[troll].hp = 35;
            start(&mut arena, troll);
            assert_eq!(arena[troll].hp, 40);
        }

        #[test]
        fn suppressing_damage_stops_one_turn_of_healing() {
            let (mut arena, troll) = troll_arena();
            arena[troll].hp = 20;
            arena[troll].record_damage_type(DamageType::Fire);
            start(&mut arena, troll);
            assert_eq!(arena[troll].hp, 20);

            arena[troll].clear_damage_taken();
            arena[troll].record_damage_type(DamageType::Slashing);
            start(&mut arena, troll);
            assert_eq!(arena[troll].hp, 30);
        }
    }

    mod hit_and_run_tests {
        use std::sync::Arc;

        use lattice::{distance_ft, GridPos};

        use super::*;
        use crate::action::Action;
        use crate::creature::Creature;
        use crate::dice::ScriptedDice;
        use crate::encounter::EncounterConfig;
        use crate::narration::NullSink;
        use crate::tests::helpers::{arena_of, brute, stat_block};

        /// A glaive fighter standing next to an ogre, with full movement.
        fn engaged() -> (Arena, CombatantId, CombatantId) {
            let mut block = stat_block("Skirmisher", 20, 14);
            block.actions = vec![Action::melee("Glaive", 5, vec![]).with_reach(10)];
            block.passives = vec![Passive::HitAndRun];
            let skirmisher = Creature::new(Arc::new(block));
            let mut arena = arena_of(vec![skirmisher], vec![brute("Ogre", 59, 11)]);
            let (a, b) = (arena.ids()[0], arena.ids()[1]);
            let beside = arena[a].position - GridPos::Y;
            arena.grid_mut().relocate(b, beside).unwrap();
            arena[b].position = beside;
            arena[a].refill_movement();
            (arena, a, b)
        }

        fn finish(arena: &mut Arena, id: CombatantId) {
            let config = EncounterConfig::default();
            let mut dice = ScriptedDice::new(Vec::<u32>::new());
            let mut sink = NullSink;
            let mut ctx = TurnContext::new(&mut dice, &mut sink, &config);
            run_at_end(arena, &mut ctx, id);
        }

        #[test]
        fn backs_away_but_stays_in_reach() {
            let (mut arena, a, b) = engaged();
            let start = arena[a].position;
            arena[a].focus = Some(b);
            finish(&mut arena, a);
            assert_eq!(arena[a].position, start + GridPos::Y);
            assert_eq!(distance_ft(arena[a].position, arena[b].position), 10);
            assert_eq!(arena[a].movement(), 25);
            assert_eq!(arena.grid().position_of(a), Some(arena[a].position));
        }

        #[test]
        fn stays_put_without_a_focus() {
            let (mut arena, a, _) = engaged();
            let start = arena[a].position;
            finish(&mut arena, a);
            assert_eq!(arena[a].position, start);
            assert_eq!(arena[a].movement(), 30);
        }

        #[test]
        fn stays_put_with_no_movement_left() {
            let (mut arena, a, b) = engaged();
            let start = arena[a].position;
            arena[a].focus = Some(b);
            arena[a].set_movement(0);
            finish(&mut arena, a);
            assert_eq!(arena[a].position, start);
        }
    }
}
