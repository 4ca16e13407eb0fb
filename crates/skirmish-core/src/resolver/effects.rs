//! Secondary effects of a hit, and digestion.

use tracing::debug;

use crate::action::{Action, OnHit};
use crate::arena::Arena;
use crate::conditions::ConditionEffect;
use crate::creature::CombatantId;
use crate::damage::DamageType;
use crate::movement;
use crate::narration::Severity;
use crate::turn::TurnContext;

use super::damage::{apply_damage, kill, DamagePart};
use super::save::saving_throw;

/// Apply a condition from `source` to `target`, narrating the result.
pub(crate) fn inflict(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    source: Option<CombatantId>,
    target: CombatantId,
    effect: ConditionEffect,
) -> bool {
    let creature = &mut arena[target];
    let applied = creature.apply_condition(effect.kind, effect.state(source));
    let name = creature.name().to_string();
    let kind = effect.kind;
    if applied {
        debug!(creature = %name, condition = %kind, "condition applied");
        ctx.narrate_detail(Severity::Action, || format!("{name} is {kind}."));
    } else {
        ctx.narrate_detail(Severity::Action, || format!("{name} is immune to being {kind}."));
    }
    applied
}

/// Fire `action`'s on-hit effects in order. Stops as soon as the target dies.
pub(crate) fn apply_on_hit(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    attacker: CombatantId,
    target: CombatantId,
    action: &Action,
    dealt: i32,
) {
    for effect in &action.on_hit {
        if arena[target].is_dead() || arena[attacker].is_dead() {
            break;
        }
        if let Some(check) = resist_check(effect) {
            let save = saving_throw(&arena[target], check.ability, check.dc, ctx.rng);
            if save.success {
                let name = arena[target].name().to_string();
                ctx.narrate_detail(Severity::Action, || {
                    format!("{name} resists ({} vs DC {}).", save.total, check.dc)
                });
                continue;
            }
        }
        match effect {
            OnHit::Condition { apply, .. } => {
                inflict(arena, ctx, Some(attacker), target, *apply);
            }
            OnHit::Knockback { distance, .. } => {
                let from = arena[attacker].position;
                let pushed = movement::forced_move(arena, ctx, target, from, *distance);
                if pushed.collided {
                    let damage =
                        DamagePart::new(ctx.config.collision_damage, DamageType::Bludgeoning);
                    apply_damage(arena, ctx, Some(attacker), target, &[damage], 1);
                }
            }
            OnHit::Swallow { max_size, .. } => {
                let fits = arena[target].size() <= *max_size;
                let room = arena[attacker].has_stomach_room();
                if fits && room && arena.swallow(attacker, target) {
                    let who = arena[attacker].name().to_string();
                    let whom = arena[target].name().to_string();
                    debug!(swallower = %who, victim = %whom, "swallowed");
                    ctx.narrate_detail(Severity::Action, || {
                        format!("{who} swallows {whom} whole!")
                    });
                }
            }
            OnHit::DrainMaxHp => {
                let creature = &mut arena[target];
                creature.drain_max_hp(dealt);
                let (name, max) = (creature.name().to_string(), creature.max_hp);
                ctx.narrate_detail(Severity::Action, || {
                    format!("{name}'s maximum HP drops to {max}.")
                });
                if arena[target].is_dead() {
                    kill(arena, ctx, Some(attacker), target);
                }
            }
        }
    }
}

fn resist_check(effect: &OnHit) -> Option<crate::action::SaveCheck> {
    match effect {
        OnHit::Condition { resist, .. } | OnHit::Knockback { resist, .. } => *resist,
        OnHit::Swallow { .. } | OnHit::DrainMaxHp => None,
    }
}

/// Start-of-turn digestion: every creature in `id`'s stomach takes the
/// digest damage of `id`'s swallowing action.
pub(crate) fn digest(arena: &mut Arena, ctx: &mut TurnContext<'_>, id: CombatantId) {
    let template = arena[id].template_arc();
    let Some(term) = template.actions.iter().flat_map(|a| &a.on_hit).find_map(|e| match e {
        OnHit::Swallow { digest, .. } => *digest,
        _ => None,
    }) else {
        return;
    };
    for victim in arena[id].stomach().to_vec() {
        if arena[victim].is_dead() {
            continue;
        }
        let raw = term.dice.roll(ctx.rng);
        let name = arena[victim].name().to_string();
        ctx.narrate(Severity::Action, || format!("{name} is being digested."));
        apply_damage(arena, ctx, Some(id), victim, &[DamagePart::new(raw, term.kind)], 1);
    }
}
