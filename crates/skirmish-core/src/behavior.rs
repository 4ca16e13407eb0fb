//! Behavior strategies: who a creature attacks, with what, and how it gets
//! there.
//!
//! The scheduler only knows the [`Behavior`] trait. Each turn, for every
//! attack the creature is allowed, it calls [`Behavior::act`], which by
//! default:
//!
//! 1. picks a target ([`Behavior::pick_target`]) and stores it as the focus,
//!    or clears the focus when no enemy can be attacked
//! 2. picks a ready weapon ([`Behavior::pick_weapon`])
//! 3. moves into range, or backs off when a ranged weapon is crowded
//! 4. resolves the action if the target ended up in range
//!
//! # Weapon preference
//!
//! With an enemy adjacent, an in-range melee action is preferred (special
//! before basic). Otherwise the first ready action that can reach the target
//! this turn is taken in the order special ranged, basic ranged, special
//! melee, basic melee; failing that, the ready action with the longest reach.
//!
//! # Plugin Registry
//!
//! Stat blocks name their strategy by id. [`BehaviorRegistry`] maps ids to
//! shared strategy objects and falls back to the standard strategy for ids
//! it does not know.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::action::{Action, ActionGroup};
use crate::arena::Arena;
use crate::behaviors::{Pack, Standard};
use crate::conditions::ConditionKind;
use crate::creature::{Ability, CombatantId};
use crate::encounter::EncounterConfig;
use crate::movement;
use crate::narration::Severity;
use crate::resolver::{resolve_action, AttackOutcome};
use crate::turn::TurnContext;

/// Search order for weapons when no enemy is adjacent.
const PREFERENCE: [(ActionGroup, bool); 4] = [
    (ActionGroup::Special, true),
    (ActionGroup::Basic, true),
    (ActionGroup::Special, false),
    (ActionGroup::Basic, false),
];

// =============================================================================
// Behavior Trait
// =============================================================================

/// A targeting and weapon-choice strategy.
///
/// Strategies hold no per-creature state; everything they remember lives on
/// the creature (its focus) so one instance can serve every creature that
/// names it.
pub trait Behavior: Send + Sync {
    /// Id stat blocks use to select this strategy.
    fn id(&self) -> &'static str;

    /// The enemy to attack, or `None` when nothing can be attacked.
    fn pick_target(
        &self,
        arena: &Arena,
        config: &EncounterConfig,
        id: CombatantId,
    ) -> Option<CombatantId>;

    /// Index of the action to use against `target`.
    fn pick_weapon(&self, arena: &Arena, id: CombatantId, target: CombatantId) -> Option<usize> {
        choose_weapon(arena, id, target)
    }

    /// Take one attack: target, weapon, movement and resolution.
    fn act(
        &self,
        arena: &mut Arena,
        ctx: &mut TurnContext<'_>,
        id: CombatantId,
    ) -> Option<AttackOutcome> {
        engage(self, arena, ctx, id)
    }
}

// =============================================================================
// Shared Targeting Rules
// =============================================================================

/// The creature that swallowed `id`, if any.
#[must_use]
pub fn swallowed_by(arena: &Arena, id: CombatantId) -> Option<CombatantId> {
    arena[id]
        .conditions()
        .get(ConditionKind::Swallowed)
        .and_then(|state| state.source)
}

/// True if `target` is an enemy of `id` that can be attacked.
#[must_use]
pub fn is_valid_target(arena: &Arena, id: CombatantId, target: CombatantId) -> bool {
    target.side() != id.side() && arena.get(target).is_some_and(|c| c.is_targetable())
}

/// `id`'s current focus, if it can still be attacked.
#[must_use]
pub fn valid_focus(arena: &Arena, id: CombatantId) -> Option<CombatantId> {
    arena[id]
        .focus
        .filter(|&target| is_valid_target(arena, id, target))
}

/// A swallowed creature can only fight its way out: `Some(target)` while
/// swallowed, where `target` is `None` once the swallower is dead.
#[must_use]
#[allow(clippy::option_option)]
pub fn forced_target(arena: &Arena, id: CombatantId) -> Option<Option<CombatantId>> {
    swallowed_by(arena, id).map(|container| (!arena[container].is_dead()).then_some(container))
}

/// Closest enemy for dim creatures, weakest for the rest.
#[must_use]
pub fn default_target(
    arena: &Arena,
    config: &EncounterConfig,
    id: CombatantId,
) -> Option<CombatantId> {
    let me = &arena[id];
    let enemies = arena.party(id.side().opponent());
    if me.score(Ability::Int) <= config.low_intelligence {
        enemies.closest_alive(me.position)
    } else {
        enemies.weakest_alive()
    }
}

/// Pick the action to use against `target`. See the module docs for the
/// preference order.
#[must_use]
pub fn choose_weapon(arena: &Arena, id: CombatantId, target: CombatantId) -> Option<usize> {
    let me = &arena[id];
    let distance = arena.distance(id, target);
    let ready: Vec<(usize, &Action)> = me
        .actions()
        .filter(|(_, _, slot)| slot.is_ready())
        .map(|(i, action, _)| (i, action))
        .collect();

    if arena.enemy_adjacent(id) || me.is_swallowed() {
        let melee = ready
            .iter()
            .filter(|(_, a)| a.is_melee() && a.in_range(distance))
            .min_by_key(|(i, a)| (a.group != ActionGroup::Special, *i));
        if let Some(&(i, _)) = melee {
            return Some(i);
        }
    }

    let reachable =
        |a: &Action| distance >= a.min_range && distance <= a.reach + me.movement();
    for (group, ranged) in PREFERENCE {
        let found = ready
            .iter()
            .find(|(_, a)| a.group == group && a.ranged == ranged && reachable(a));
        if let Some(&(i, _)) = found {
            return Some(i);
        }
    }

    ready
        .iter()
        .min_by_key(|(i, a)| (std::cmp::Reverse(a.reach), *i))
        .map(|&(i, _)| i)
}

/// The default turn body shared by every strategy.
pub fn engage<B: Behavior + ?Sized>(
    behavior: &B,
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    id: CombatantId,
) -> Option<AttackOutcome> {
    let Some(target) = behavior.pick_target(arena, ctx.config, id) else {
        arena[id].focus = None;
        let name = arena[id].name().to_string();
        ctx.narrate(Severity::Action, || format!("{name} has no one left to fight."));
        return None;
    };
    arena[id].focus = Some(target);

    let Some(index) = behavior.pick_weapon(arena, id, target) else {
        let name = arena[id].name().to_string();
        ctx.narrate(Severity::Action, || format!("{name} has nothing to attack with."));
        return None;
    };
    let template = arena[id].template_arc();
    let action = &template.actions[index];
    trace!(creature = %arena[id].name(), target = %target, action = %action.name, "engaging");

    let distance = arena.distance(id, target);
    if distance < action.min_range {
        movement::keep_distance(arena, ctx, id, target, action.reach);
    } else if !action.in_range(distance) {
        movement::close_distance(arena, ctx, id, target, action.reach);
    } else if action.ranged && arena.enemy_adjacent(id) {
        movement::keep_distance(arena, ctx, id, target, action.reach);
    }

    if !action.in_range(arena.distance(id, target)) {
        let name = arena[id].name().to_string();
        ctx.narrate_detail(Severity::Movement, || {
            format!("{name} is still out of range with {}.", action.name)
        });
        return None;
    }
    Some(resolve_action(arena, ctx, id, target, index))
}

// =============================================================================
// Behavior Registry
// =============================================================================

/// Strategies by id.
///
/// # Note on `HashMap` Usage
///
/// The registry is only ever queried by key; it is never iterated in hash
/// order, except by [`BehaviorRegistry::ids`] which sorts.
#[derive(Clone)]
pub struct BehaviorRegistry {
    behaviors: HashMap<&'static str, Arc<dyn Behavior>>,
    fallback: Arc<dyn Behavior>,
}

impl BehaviorRegistry {
    /// A registry holding only the standard strategy.
    #[must_use]
    pub fn new() -> Self {
        let fallback: Arc<dyn Behavior> = Arc::new(Standard);
        let mut behaviors = HashMap::new();
        behaviors.insert(fallback.id(), Arc::clone(&fallback));
        Self {
            behaviors,
            fallback,
        }
    }

    /// The standard and pack strategies.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Pack));
        registry
    }

    /// Add or replace a strategy under its own id.
    pub fn register(&mut self, behavior: Arc<dyn Behavior>) {
        self.behaviors.insert(behavior.id(), behavior);
    }

    /// The strategy registered as `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Behavior>> {
        self.behaviors.get(id)
    }

    /// The strategy for a stat block's behavior id; the standard strategy
    /// when the id is absent or unknown.
    #[must_use]
    pub fn resolve(&self, id: Option<&str>) -> Arc<dyn Behavior> {
        match id {
            None => Arc::clone(&self.fallback),
            Some(key) => self.get(key).cloned().unwrap_or_else(|| {
                warn!(behavior = key, "unknown behavior, using standard");
                Arc::clone(&self.fallback)
            }),
        }
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.behaviors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
