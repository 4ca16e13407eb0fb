//! Damage application and death.

use tracing::info;

use crate::arena::Arena;
use crate::creature::CombatantId;
use crate::damage::{DamageType, DamageTypes};
use crate::narration::Severity;
use crate::passive;
use crate::turn::TurnContext;

/// Raw damage of one type, before the target's defences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamagePart {
    /// Amount rolled
    pub raw: i32,
    /// Damage type
    pub kind: DamageType,
}

impl DamagePart {
    /// Creates a damage part.
    #[must_use]
    pub const fn new(raw: i32, kind: DamageType) -> Self {
        Self { raw, kind }
    }
}

/// What a batch of damage did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DamageReport {
    /// Total HP removed after mitigation
    pub dealt: i32,
    /// Mitigated amount per part, in input order
    pub parts: Vec<(i32, DamageType)>,
    /// The target died
    pub killed: bool,
    /// An avoid-death passive kept the target alive
    pub averted: bool,
}

/// Mitigate `parts` by `target`'s defences and subtract the sum from its HP.
///
/// `source` is credited with the damage dealt. If the target drops to its
/// death threshold, its avoid-death passives are consulted with the given
/// critical `multiplier`; if none vetoes, the target is killed.
/// Damage to a creature that is already dead, or an empty batch, is ignored.
pub fn apply_damage(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    source: Option<CombatantId>,
    target: CombatantId,
    parts: &[DamagePart],
    multiplier: u32,
) -> DamageReport {
    if parts.is_empty() || arena[target].is_dead() {
        return DamageReport::default();
    }
    let defenses = *arena[target].defenses();
    let mut report = DamageReport::default();
    let mut kinds = DamageTypes::empty();
    for part in parts {
        let amount = defenses.mitigate(part.raw, part.kind);
        report.dealt += amount;
        report.parts.push((amount, part.kind));
        kinds |= part.kind.flag();
        if amount > 0 {
            arena[target].record_damage_type(part.kind);
        }
    }

    arena[target].hp -= report.dealt;
    if let Some(src) = source {
        arena[src].counters.damage_dealt += i64::from(report.dealt);
    }

    let name = arena[target].name().to_string();
    let hp = arena[target].hp;
    ctx.narrate_detail(Severity::Action, || {
        let listed = report
            .parts
            .iter()
            .map(|(amount, kind)| format!("{amount} {kind}"))
            .collect::<Vec<_>>()
            .join(" + ");
        format!("{name} takes {listed} damage ({hp} HP left).")
    });

    if arena[target].is_dead() {
        if passive::avoid_death(arena, ctx, target, report.dealt, multiplier, kinds) {
            report.averted = true;
        } else {
            kill(arena, ctx, source, target);
            report.killed = true;
        }
    }
    report
}

/// Death bookkeeping: counters, narration, and removal from the grid.
///
/// The killer's kill count rises, or its suicide count if it killed itself.
/// Anything the victim had swallowed is regurgitated around its cell.
pub fn kill(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    source: Option<CombatantId>,
    victim: CombatantId,
) {
    arena[victim].counters.deaths += 1;
    match source {
        Some(src) if src == victim => arena[victim].counters.suicides += 1,
        Some(src) => arena[src].counters.kills += 1,
        None => {}
    }

    let name = arena[victim].name().to_string();
    let hp = arena[victim].hp;
    info!(creature = %name, hp, round = ctx.round, "creature died");
    match source {
        Some(src) if src == victim => {
            ctx.narrate(Severity::Summary, || format!("{name} dies by its own hand."));
        }
        Some(src) => {
            let killer = arena[src].name().to_string();
            ctx.narrate(Severity::Summary, || format!("{name} is killed by {killer}."));
        }
        None => ctx.narrate(Severity::Summary, || format!("{name} dies.")),
    }

    for freed in arena.bury(victim) {
        let freed_name = arena[freed].name().to_string();
        ctx.narrate_detail(Severity::Action, || {
            format!("{freed_name} is released from {name}'s stomach and lands prone.")
        });
    }
}
