//! Attack rolls and the full action flow.

use lattice::distance_ft;
use tracing::{debug, trace};

use crate::action::{Action, DamageTerm, SaveSpec};
use crate::arena::Arena;
use crate::conditions::{ConditionEffect, ConditionKind, ConditionState, RollKind};
use crate::creature::{CombatantId, Creature};
use crate::damage::DamageType;
use crate::dice::{d20, Advantage, RandomSource};
use crate::narration::Severity;
use crate::passive;
use crate::turn::TurnContext;

use super::damage::{apply_damage, DamagePart};
use super::effects::{apply_on_hit, inflict};
use super::save::{saving_throw, SaveOutcome};

/// Result of one attack roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitRoll {
    /// The d20 kept
    pub natural: u32,
    /// Natural roll plus attack bonus
    pub total: i32,
    /// Whether the attack hit
    pub hit: bool,
    /// Damage dice multiplier: 2 on a critical, else 1
    pub multiplier: u32,
    /// Natural 1: the attacker may hurt itself
    pub fumbled: bool,
}

/// What an action did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttackOutcome {
    /// The action landed
    pub hit: bool,
    /// Damage dealt after mitigation
    pub damage: i32,
    /// The target died
    pub killed: bool,
}

/// Roll `attacker`'s attack with `to_hit` against `target`.
///
/// The attacker's hit advantage is stacked with +1 when the target is
/// exposed (prone, restrained or paralysed) and with `situational`, then a
/// d20 is rolled. A natural 1 misses and fumbles; a natural 20 hits for
/// double dice; otherwise the total must beat the target's AC. Attacks on a
/// paralysed target are always critical hits.
pub fn attack_roll(
    attacker: &Creature,
    target: &Creature,
    to_hit: i32,
    situational: Advantage,
    rng: &mut dyn RandomSource,
) -> HitRoll {
    let mut advantage = attacker.advantage(RollKind::Hit);
    if target.conditions().exposed() {
        advantage = advantage.stack(Advantage::ADVANTAGE);
    }
    advantage = advantage.stack(situational);

    let natural = d20(rng, advantage);
    let total = i32::try_from(natural).unwrap_or(20) + to_hit;
    let (hit, multiplier, fumbled) = if target.has(ConditionKind::Paralyzed) {
        (true, 2, false)
    } else {
        match natural {
            1 => (false, 1, true),
            20 => (true, 2, false),
            _ => (total > target.armor_class(), 1, false),
        }
    };
    HitRoll {
        natural,
        total,
        hit,
        multiplier,
        fumbled,
    }
}

/// Use `attacker`'s action at `index` against `target`.
///
/// # Panics
///
/// Panics if `attacker` is dead; a dead creature acting is a scheduler bug.
pub fn resolve_action(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    attacker: CombatantId,
    target: CombatantId,
    index: usize,
) -> AttackOutcome {
    assert!(!arena[attacker].is_dead(), "dead creature {attacker} acting");
    let template = arena[attacker].template_arc();
    let Some(action) = template.actions.get(index) else {
        return AttackOutcome::default();
    };
    arena[attacker].spend_action(index);

    let who = arena[attacker].name().to_string();
    let whom = arena[target].name().to_string();
    let distance = distance_ft(arena[attacker].position, arena[target].position);

    let (hit, multiplier) = match action.to_hit {
        Some(bonus) => {
            let situational = if action.ranged && arena.enemy_adjacent(attacker) {
                Advantage::DISADVANTAGE
            } else {
                Advantage::NORMAL
            };
            let roll =
                attack_roll(&arena[attacker], &arena[target], bonus, situational, ctx.rng);
            trace!(
                attacker = %who,
                target = %whom,
                natural = roll.natural,
                total = roll.total,
                "attack roll"
            );
            let verb = match (roll.hit, roll.multiplier, roll.fumbled) {
                (true, 2, _) => "lands a CRITICAL hit on",
                (true, _, _) => "hits",
                (false, _, true) => "fails critically attacking",
                (false, _, false) => "misses",
            };
            ctx.narrate(Severity::Action, || {
                format!(
                    "{who} {verb} {whom} with {} ({} to hit, {distance} ft).",
                    action.name, roll.total
                )
            });
            if roll.fumbled {
                fumble(arena, ctx, attacker);
            }
            (roll.hit, roll.multiplier)
        }
        None => {
            ctx.narrate(Severity::Action, || {
                format!("{who} uses {} on {whom} ({distance} ft).", action.name)
            });
            (true, 1)
        }
    };

    if !hit {
        arena[attacker].counters.misses += 1;
        return AttackOutcome::default();
    }
    arena[attacker].counters.hits += 1;
    if arena[target].is_dead() {
        return AttackOutcome {
            hit,
            ..AttackOutcome::default()
        };
    }

    let (parts, failed) = roll_damage(arena, ctx, attacker, target, action, multiplier);
    let report = apply_damage(arena, ctx, Some(attacker), target, &parts, multiplier);
    debug!(
        attacker = %who,
        target = %whom,
        damage = report.dealt,
        killed = report.killed,
        "action resolved"
    );

    if !report.killed && !arena[target].is_dead() {
        for effect in failed {
            inflict(arena, ctx, Some(attacker), target, effect);
        }
        apply_on_hit(arena, ctx, attacker, target, action, report.dealt);
    }

    AttackOutcome {
        hit,
        damage: report.dealt,
        killed: report.killed,
    }
}

/// Roll every damage term of `action` plus on-hit passive bonuses.
///
/// Returns the raw parts and the conditions inflicted by failed saves.
fn roll_damage(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    attacker: CombatantId,
    target: CombatantId,
    action: &Action,
    multiplier: u32,
) -> (Vec<DamagePart>, Vec<ConditionEffect>) {
    let mut failed = Vec::new();
    let action_save = action.save.map(|spec| {
        let outcome = roll_save(arena, ctx, target, spec);
        if !outcome.success {
            failed.extend(spec.on_fail);
        }
        (spec, outcome)
    });

    let bonus_terms = passive::on_hit_terms(arena, attacker);
    let terms = action
        .damage
        .iter()
        .copied()
        .chain(bonus_terms.into_iter().map(|(_, term)| term));

    let mut parts = Vec::new();
    for term in terms {
        parts.push(roll_term(arena, ctx, target, term, multiplier, action_save, &mut failed));
    }
    (parts, failed)
}

fn roll_term(
    arena: &Arena,
    ctx: &mut TurnContext<'_>,
    target: CombatantId,
    term: DamageTerm,
    multiplier: u32,
    action_save: Option<(SaveSpec, SaveOutcome)>,
    failed: &mut Vec<ConditionEffect>,
) -> DamagePart {
    let mut raw = term.dice.roll_scaled(multiplier, ctx.rng);
    let save = match term.save {
        Some(spec) => {
            let outcome = roll_save(arena, ctx, target, spec);
            if !outcome.success {
                failed.extend(spec.on_fail);
            }
            Some((spec, outcome))
        }
        None => action_save,
    };
    if let Some((spec, outcome)) = save {
        if outcome.success {
            raw = spec.scale(raw);
        }
    }
    DamagePart::new(raw, term.kind)
}

fn roll_save(
    arena: &Arena,
    ctx: &mut TurnContext<'_>,
    target: CombatantId,
    spec: SaveSpec,
) -> SaveOutcome {
    let outcome = saving_throw(&arena[target], spec.ability, spec.dc, ctx.rng);
    let name = arena[target].name();
    let verdict = if outcome.success { "succeeds" } else { "fails" };
    ctx.narrate_detail(Severity::Action, || {
        format!(
            "{name} {verdict} a DC {} {} save ({}).",
            spec.dc, spec.ability, outcome.total
        )
    });
    outcome
}

/// A natural 1: on a d3 roll of 1 the attacker falls prone and hurts itself.
fn fumble(arena: &mut Arena, ctx: &mut TurnContext<'_>, attacker: CombatantId) {
    if ctx.rng.roll_die(3) != 1 {
        return;
    }
    let self_damage = ctx.config.fumble_damage.roll(ctx.rng);
    arena[attacker].apply_condition(ConditionKind::Prone, ConditionState::default());
    let name = arena[attacker].name().to_string();
    ctx.narrate_detail(Severity::Action, || {
        format!("{name} stumbles, falls prone and hurts itself.")
    });
    apply_damage(
        arena,
        ctx,
        Some(attacker),
        attacker,
        &[DamagePart::new(self_damage, DamageType::Bludgeoning)],
        1,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::tests::helpers::brute;

    fn pair() -> (Creature, Creature) {
        (brute("Wolf", 11, 13), brute("Goblin", 7, 14))
    }

    #[test]
    fn total_must_beat_ac() {
        let (a, t) = pair();
        let mut dice = ScriptedDice::new([8, 9]);
        assert!(!attack_roll(&a, &t, 6, Advantage::NORMAL, &mut dice).hit);
        assert!(attack_roll(&a, &t, 6, Advantage::NORMAL, &mut dice).hit);
    }

    #[test]
    fn natural_one_misses_and_fumbles_despite_bonus() {
        let (a, t) = pair();
        let mut dice = ScriptedDice::new([1]);
        let roll = attack_roll(&a, &t, 50, Advantage::NORMAL, &mut dice);
        assert!(!roll.hit);
        assert!(roll.fumbled);
    }

    #[test]
    fn paralysed_target_is_always_critical() {
        let (a, mut t) = pair();
        t.apply_condition(ConditionKind::Paralyzed, ConditionState::default());
        let mut dice = ScriptedDice::new([1, 1]);
        let roll = attack_roll(&a, &t, 0, Advantage::NORMAL, &mut dice);
        assert!(roll.hit);
        assert_eq!(roll.multiplier, 2);
        assert!(!roll.fumbled);
    }

    #[test]
    fn exposed_target_grants_advantage() {
        let (a, mut t) = pair();
        t.apply_condition(ConditionKind::Prone, ConditionState::default());
        let mut dice = ScriptedDice::new([3, 17]);
        let roll = attack_roll(&a, &t, 0, Advantage::NORMAL, &mut dice);
        assert_eq!(roll.natural, 17);
        assert!(roll.hit);
    }

    #[test]
    fn prone_attacker_against_prone_target_rolls_once() {
        let (mut a, mut t) = pair();
        a.apply_condition(ConditionKind::Prone, ConditionState::default());
        t.apply_condition(ConditionKind::Prone, ConditionState::default());
        let mut dice = ScriptedDice::new([12]);
        let roll = attack_roll(&a, &t, 0, Advantage::NORMAL, &mut dice);
        assert_eq!(roll.natural, 12);
        assert_eq!(dice.served(), 1);
    }
}
