//! The condition state machine.
//!
//! Every creature holds one slot per [`ConditionKind`]. A slot is either off
//! (`None`) or on, carrying the escape DC, the ability used to escape, an
//! optional duration in rounds and the creature that caused it.
//!
//! Conditions feed two derived views of a creature:
//!
//! - an [`AdvantageTable`] of self-inflicted penalties (restrained creatures
//!   attack and dodge at disadvantage, prone ones attack at disadvantage)
//! - whether the creature is pinned in place (speed 0)
//!
//! Both are recomputed whenever a slot changes, so clearing a condition
//! always undoes exactly what setting it did. The per-turn ticks
//! ([`begin_turn`] and [`end_turn`]) drive durations, escape saves and
//! standing up.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arena::Arena;
use crate::creature::{Ability, CombatantId};
use crate::dice::Advantage;
use crate::narration::Severity;
use crate::resolver::saving_throw;
use crate::turn::TurnContext;

// =============================================================================
// Condition Kinds
// =============================================================================

/// The conditions a creature can suffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    /// Held by webs or nets; pinned, attacks and dex saves at disadvantage.
    Restrained,
    /// Knocked down; attacks at disadvantage, attackers gain advantage.
    Prone,
    /// Attacks at disadvantage.
    Poisoned,
    /// Helpless; pinned, fails str/dex saves, every hit against it is critical.
    Paralyzed,
    /// Held by a creature; pinned, attacks and dex saves at disadvantage.
    Grappled,
    /// Attacks at disadvantage.
    Frightened,
    /// Inside another creature's stomach.
    Swallowed,
}

impl ConditionKind {
    /// All kinds, in slot order.
    pub const ALL: [Self; 7] = [
        Self::Restrained,
        Self::Prone,
        Self::Poisoned,
        Self::Paralyzed,
        Self::Grappled,
        Self::Frightened,
        Self::Swallowed,
    ];

    /// Slot index of this kind.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The set containing only this kind.
    #[must_use]
    pub const fn flag(self) -> ConditionSet {
        match self {
            Self::Restrained => ConditionSet::RESTRAINED,
            Self::Prone => ConditionSet::PRONE,
            Self::Poisoned => ConditionSet::POISONED,
            Self::Paralyzed => ConditionSet::PARALYZED,
            Self::Grappled => ConditionSet::GRAPPLED,
            Self::Frightened => ConditionSet::FRIGHTENED,
            Self::Swallowed => ConditionSet::SWALLOWED,
        }
    }

    /// Lowercase name as written in stat blocks.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Restrained => "restrained",
            Self::Prone => "prone",
            Self::Poisoned => "poisoned",
            Self::Paralyzed => "paralyzed",
            Self::Grappled => "grappled",
            Self::Frightened => "frightened",
            Self::Swallowed => "swallowed",
        }
    }

    /// Whether the condition pins both speeds to 0.
    #[must_use]
    pub const fn immobilizes(self) -> bool {
        matches!(self, Self::Paralyzed | Self::Grappled | Self::Restrained | Self::Swallowed)
    }

    /// Whether attackers roll with advantage against a creature in this state.
    #[must_use]
    pub const fn exposes(self) -> bool {
        matches!(self, Self::Prone | Self::Restrained | Self::Paralyzed)
    }

    /// Rolls the afflicted creature makes at disadvantage.
    #[must_use]
    pub fn hindered_rolls(self) -> &'static [RollKind] {
        match self {
            Self::Restrained | Self::Grappled => &[RollKind::Hit, RollKind::Save(Ability::Dex)],
            Self::Prone | Self::Poisoned | Self::Frightened | Self::Swallowed => &[RollKind::Hit],
            Self::Paralyzed => &[],
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// A set of condition kinds, used for immunities.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ConditionSet: u8 {
        /// Restrained
        const RESTRAINED = 1 << 0;
        /// Prone
        const PRONE = 1 << 1;
        /// Poisoned
        const POISONED = 1 << 2;
        /// Paralyzed
        const PARALYZED = 1 << 3;
        /// Grappled
        const GRAPPLED = 1 << 4;
        /// Frightened
        const FRIGHTENED = 1 << 5;
        /// Swallowed
        const SWALLOWED = 1 << 6;
    }
}

impl ConditionSet {
    /// True when `kind` is in the set.
    #[must_use]
    pub fn has(self, kind: ConditionKind) -> bool {
        self.contains(kind.flag())
    }
}

impl FromIterator<ConditionKind> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = ConditionKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |acc, kind| acc | kind.flag())
    }
}

// =============================================================================
// Advantage Table
// =============================================================================

/// A roll that can be made with advantage or disadvantage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollKind {
    /// Attack rolls
    Hit,
    /// Saving throws for one ability
    Save(Ability),
}

/// Advantage state per roll kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AdvantageTable {
    hit: Advantage,
    saves: [Advantage; 6],
}

impl AdvantageTable {
    /// Current state for `kind`.
    #[must_use]
    pub const fn get(&self, kind: RollKind) -> Advantage {
        match kind {
            RollKind::Hit => self.hit,
            RollKind::Save(ability) => self.saves[ability.index()],
        }
    }

    /// Overwrite the state for `kind`.
    pub fn set(&mut self, kind: RollKind, value: Advantage) {
        match kind {
            RollKind::Hit => self.hit = value,
            RollKind::Save(ability) => self.saves[ability.index()] = value,
        }
    }

    /// Stack a contribution onto `kind`, saturating.
    pub fn adjust(&mut self, kind: RollKind, delta: Advantage) {
        self.set(kind, self.get(kind).stack(delta));
    }

    /// Entry-wise stack of two tables.
    #[must_use]
    pub fn combined(&self, other: &Self) -> Self {
        let mut out = *self;
        out.hit = out.hit.stack(other.hit);
        for (mine, theirs) in out.saves.iter_mut().zip(other.saves) {
            *mine = mine.stack(theirs);
        }
        out
    }
}

// =============================================================================
// Condition State
// =============================================================================

/// Data carried by a condition while it is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConditionState {
    /// DC of the save that ends the condition
    pub dc: i32,
    /// Ability used for that save
    pub ability: Ability,
    /// Rounds left, or `None` for no limit
    pub duration: Option<u32>,
    /// The creature that caused the condition
    pub source: Option<CombatantId>,
}

/// A condition an action can inflict, as written in stat blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionEffect {
    /// Condition applied
    pub kind: ConditionKind,
    /// Escape DC
    #[serde(default)]
    pub dc: i32,
    /// Escape ability
    #[serde(default)]
    pub ability: Ability,
    /// Duration in rounds
    #[serde(default)]
    pub duration: Option<u32>,
}

impl ConditionEffect {
    /// An effect with no escape save and no duration.
    #[must_use]
    pub const fn plain(kind: ConditionKind) -> Self {
        Self {
            kind,
            dc: 0,
            ability: Ability::Str,
            duration: None,
        }
    }

    /// The state recorded on the victim.
    #[must_use]
    pub const fn state(&self, source: Option<CombatantId>) -> ConditionState {
        ConditionState {
            dc: self.dc,
            ability: self.ability,
            duration: self.duration,
            source,
        }
    }
}

/// One slot per condition kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Conditions {
    slots: [Option<ConditionState>; 7],
}

impl Conditions {
    /// State of `kind` if it is on.
    #[must_use]
    pub fn get(&self, kind: ConditionKind) -> Option<&ConditionState> {
        self.slots[kind.index()].as_ref()
    }

    /// Mutable state of `kind` if it is on.
    pub fn get_mut(&mut self, kind: ConditionKind) -> Option<&mut ConditionState> {
        self.slots[kind.index()].as_mut()
    }

    /// True when `kind` is on.
    #[must_use]
    pub const fn is_on(&self, kind: ConditionKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    /// Turn `kind` on, replacing any previous state.
    pub(crate) fn set(&mut self, kind: ConditionKind, state: ConditionState) {
        self.slots[kind.index()] = Some(state);
    }

    /// Turn `kind` off, returning what it carried.
    pub(crate) fn clear(&mut self, kind: ConditionKind) -> Option<ConditionState> {
        self.slots[kind.index()].take()
    }

    /// Every condition currently on.
    pub fn active(&self) -> impl Iterator<Item = ConditionKind> + '_ {
        ConditionKind::ALL.into_iter().filter(|k| self.is_on(*k))
    }

    /// The active conditions as a set.
    #[must_use]
    pub fn as_set(&self) -> ConditionSet {
        self.active().collect()
    }

    /// True when any active condition pins the creature in place.
    #[must_use]
    pub fn immobilized(&self) -> bool {
        self.active().any(ConditionKind::immobilizes)
    }

    /// True when any active condition gives attackers advantage.
    #[must_use]
    pub fn exposed(&self) -> bool {
        self.active().any(ConditionKind::exposes)
    }

    /// Disadvantage imposed by the active conditions.
    #[must_use]
    pub fn penalties(&self) -> AdvantageTable {
        let mut table = AdvantageTable::default();
        for kind in self.active() {
            for roll in kind.hindered_rolls() {
                table.set(*roll, Advantage::DISADVANTAGE);
            }
        }
        table
    }
}

// =============================================================================
// Turn Ticks
// =============================================================================

/// Start-of-turn bookkeeping for `id`.
///
/// In order: poison ticks down; grapple and restraint end if their source is
/// dead, otherwise the creature tries to escape; a swallowed creature follows
/// its swallower; movement points refill; a prone creature that can move
/// stands up at the cost of half its movement; spent abilities try to
/// recharge and per-turn uses refill.
pub fn begin_turn(arena: &mut Arena, ctx: &mut TurnContext<'_>, id: CombatantId) {
    tick_duration(arena, ctx, id, ConditionKind::Poisoned);
    for kind in [ConditionKind::Grappled, ConditionKind::Restrained] {
        attempt_escape(arena, ctx, id, kind);
    }

    if let Some(container) = arena[id]
        .conditions()
        .get(ConditionKind::Swallowed)
        .and_then(|s| s.source)
    {
        let pos = arena[container].position;
        arena[id].position = pos;
    }

    let creature = &mut arena[id];
    creature.refill_movement();

    if creature.has(ConditionKind::Prone)
        && !creature.has(ConditionKind::Swallowed)
        && creature.movement() > 0
    {
        let half = creature.movement() / 2;
        creature.set_movement(half);
        creature.clear_condition(ConditionKind::Prone);
        let name = creature.name().to_string();
        ctx.narrate(Severity::Action, || format!("{name} stands up."));
    }

    let recharged = arena[id].start_turn_actions(ctx.rng);
    for action in recharged {
        let name = arena[id].name().to_string();
        ctx.narrate(Severity::Action, || format!("{name} recharges {action}."));
    }
}

/// End-of-turn bookkeeping for `id`: paralysis and fear tick down and the
/// creature tries to shake them off.
pub fn end_turn(arena: &mut Arena, ctx: &mut TurnContext<'_>, id: CombatantId) {
    for kind in [ConditionKind::Paralyzed, ConditionKind::Frightened] {
        if !arena[id].has(kind) {
            continue;
        }
        if tick_duration(arena, ctx, id, kind) {
            continue;
        }
        attempt_save_to_end(arena, ctx, id, kind);
    }
}

/// Count down `kind`'s duration. Returns true if it expired.
fn tick_duration(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    id: CombatantId,
    kind: ConditionKind,
) -> bool {
    let creature = &mut arena[id];
    let Some(state) = creature.conditions_mut().get_mut(kind) else {
        return false;
    };
    let Some(left) = state.duration.as_mut() else {
        return false;
    };
    *left = left.saturating_sub(1);
    if *left > 0 {
        return false;
    }
    creature.clear_condition(kind);
    let name = creature.name().to_string();
    debug!(creature = %name, condition = %kind, "condition expired");
    ctx.narrate(Severity::Action, || format!("{name} is no longer {kind}."));
    true
}

/// Grapple and restraint: free if the source died, else save to escape.
fn attempt_escape(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    id: CombatantId,
    kind: ConditionKind,
) {
    let Some(state) = arena[id].conditions().get(kind).copied() else {
        return;
    };
    let source_gone = state.source.is_some_and(|src| arena[src].is_dead());
    if source_gone {
        arena[id].clear_condition(kind);
        let name = arena[id].name().to_string();
        ctx.narrate(Severity::Action, || {
            format!("{name} is no longer {kind}, its captor is dead.")
        });
        return;
    }
    attempt_save_to_end(arena, ctx, id, kind);
}

/// Roll the condition's own save; clear it on success.
fn attempt_save_to_end(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    id: CombatantId,
    kind: ConditionKind,
) {
    let Some(state) = arena[id].conditions().get(kind).copied() else {
        return;
    };
    let save = saving_throw(&arena[id], state.ability, state.dc, ctx.rng);
    let creature = &mut arena[id];
    let name = creature.name().to_string();
    if save.success {
        creature.clear_condition(kind);
        ctx.narrate(Severity::Action, || {
            format!(
                "{name} breaks free of being {kind} ({} vs DC {}).",
                save.total, state.dc
            )
        });
    } else {
        ctx.narrate(Severity::Action, || {
            format!(
                "{name} remains {kind} ({} vs DC {}).",
                save.total, state.dc
            )
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
