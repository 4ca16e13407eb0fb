//! Creatures: the runtime combatants built from [`StatBlock`] templates.
//!
//! This module provides:
//! - [`Side`] and [`CombatantId`]: stable keys for every combatant
//! - [`Initiative`]: the turn-order value with its deterministic tie-break
//! - [`CombatCounters`]: per-encounter statistics
//! - [`ActionSlot`]: ammo, per-turn uses and recharge state of one action
//! - [`Creature`]: the mutable combat state layered over a shared template
//!
//! # Focus
//!
//! A creature's focus is a [`CombatantId`], never a reference. The id stays
//! valid for the whole encounter; whether the creature behind it can still be
//! attacked is re-checked every turn.
//!
//! # Example
//!
//! ```
//! use skirmish_core::bestiary::Bestiary;
//! use skirmish_core::creature::Creature;
//!
//! let bestiary = Bestiary::builtin();
//! let wolf = bestiary.spawn("wolf").unwrap();
//! assert!(!wolf.is_dead());
//! assert_eq!(wolf.armor_class(), 13);
//! ```

pub mod stats;

use std::fmt;
use std::sync::Arc;

use lattice::GridPos;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::conditions::{
    AdvantageTable, ConditionKind, ConditionSet, ConditionState, Conditions, RollKind,
};
use crate::damage::{DamageType, DamageTypes, Defenses};
use crate::dice::{d20, Advantage, RandomSource};

pub use stats::{Ability, AbilityScores, CreatureType, SaveBonus, Size, Speeds, StatBlock};

// =============================================================================
// Identity
// =============================================================================

/// One of the two opposing parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The first party, deployed on +y
    A,
    /// The second party, deployed on -y
    B,
}

impl Side {
    /// Both sides in order.
    pub const BOTH: [Self; 2] = [Self::A, Self::B];

    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Index into per-side arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::B => "B",
        })
    }
}

/// Stable key of a combatant: its side and its slot in that party.
///
/// Ids are ordered side A first, then by slot, which is the final
/// tie-break of the turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId {
    side: Side,
    slot: u16,
}

impl CombatantId {
    /// Creates an id from its parts.
    #[must_use]
    pub const fn new(side: Side, slot: u16) -> Self {
        Self { side, slot }
    }

    /// The party this combatant fights for.
    #[must_use]
    pub const fn side(self) -> Side {
        self.side
    }

    /// Position in the party's member list.
    #[must_use]
    pub const fn slot(self) -> usize {
        self.slot as usize
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.side, self.slot)
    }
}

// =============================================================================
// Initiative
// =============================================================================

/// Turn-order value.
///
/// Compared field by field: the d20 roll with dexterity modifier, then the
/// dexterity score, then the challenge rating in thousandths. Equal values
/// fall back to [`CombatantId`] order, so nothing is ever re-rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Initiative {
    /// d20 + dexterity modifier
    pub roll: i32,
    /// Dexterity score
    pub dexterity: i32,
    /// Challenge rating × 1000
    pub cr_milli: i32,
}

impl Initiative {
    /// Tie-broken initiative as one number, e.g. `17.153` for a roll of 17,
    /// dexterity 15 and CR 3.
    #[must_use]
    pub fn as_decimal(&self) -> f64 {
        f64::from(self.roll) + f64::from(self.dexterity) / 100.0 + f64::from(self.cr_milli) / 1e6
    }
}

// =============================================================================
// Counters
// =============================================================================

/// Statistics a creature accumulates over one encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CombatCounters {
    /// Damage dealt after mitigation
    pub damage_dealt: i64,
    /// Enemies killed
    pub kills: u32,
    /// Times this creature died
    pub deaths: u32,
    /// Deaths caused by its own action
    pub suicides: u32,
    /// Attacks that hit
    pub hits: u32,
    /// Attacks that missed
    pub misses: u32,
    /// Turns taken while alive
    pub turns_survived: u32,
}

// =============================================================================
// Action Slots
// =============================================================================

/// Mutable bookkeeping for one of a creature's actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionSlot {
    /// Shots left, `None` for unlimited
    pub ammo: Option<u32>,
    /// Uses left this turn, `None` for unlimited
    pub uses_left: Option<u32>,
    /// False while a recharging ability is spent
    pub charged: bool,
}

impl ActionSlot {
    fn new(action: &Action) -> Self {
        Self {
            ammo: action.ammo,
            uses_left: action.uses_per_turn,
            charged: true,
        }
    }

    /// Whether the action can be used right now.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.charged
            && !matches!(self.ammo, Some(0))
            && !matches!(self.uses_left, Some(0))
    }

    fn spend(&mut self, action: &Action) {
        if let Some(ammo) = self.ammo.as_mut() {
            *ammo = ammo.saturating_sub(1);
        }
        if let Some(uses) = self.uses_left.as_mut() {
            *uses = uses.saturating_sub(1);
        }
        if action.recharge.is_some() {
            self.charged = false;
        }
    }
}

// =============================================================================
// Creature
// =============================================================================

/// A combatant: a shared [`StatBlock`] plus everything that changes in a
/// fight.
#[derive(Debug, Clone)]
pub struct Creature {
    template: Arc<StatBlock>,
    name: String,
    /// Current hit points; negative values record overkill
    pub hp: i32,
    /// Current hit point maximum
    pub max_hp: i32,
    /// Transient armour class bonus
    pub ac_bonus: i32,
    speed: Speeds,
    movement: i32,
    /// Current cell; mirrors the swallower's cell while swallowed
    pub position: GridPos,
    /// Enemy currently targeted
    pub focus: Option<CombatantId>,
    initiative: Initiative,
    passive_advantage: AdvantageTable,
    conditions: Conditions,
    /// Encounter statistics
    pub counters: CombatCounters,
    slots: Vec<ActionSlot>,
    stomach: Vec<CombatantId>,
    damage_taken: DamageTypes,
    on_hit_spent: bool,
    defenses: Defenses,
    condition_immunities: ConditionSet,
}

impl Creature {
    /// Instantiate a fresh creature from its template.
    #[must_use]
    pub fn new(template: Arc<StatBlock>) -> Self {
        let defenses = Defenses {
            immunities: template.immunities.iter().copied().collect(),
            resistances: template.resistances.iter().copied().collect(),
            vulnerabilities: template.vulnerabilities.iter().copied().collect(),
        };
        Self {
            name: template.name.clone(),
            hp: template.hp,
            max_hp: template.hp,
            ac_bonus: 0,
            speed: template.speed,
            movement: template.speed.budget(),
            position: GridPos::ZERO,
            focus: None,
            initiative: Initiative::default(),
            passive_advantage: AdvantageTable::default(),
            conditions: Conditions::default(),
            counters: CombatCounters::default(),
            slots: template.actions.iter().map(ActionSlot::new).collect(),
            stomach: Vec::new(),
            damage_taken: DamageTypes::empty(),
            on_hit_spent: false,
            condition_immunities: template.condition_immunities.iter().copied().collect(),
            defenses,
            template,
        }
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Display name, unique within its party.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// The template this creature was built from.
    #[must_use]
    pub fn template(&self) -> &StatBlock {
        &self.template
    }

    /// Shared handle to the template, for iterating it while mutating the
    /// creature.
    #[must_use]
    pub fn template_arc(&self) -> Arc<StatBlock> {
        Arc::clone(&self.template)
    }

    /// Size category.
    #[must_use]
    pub fn size(&self) -> Size {
        self.template.size
    }

    // -------------------------------------------------------------------------
    // Life
    // -------------------------------------------------------------------------

    /// Dead once HP reaches the template's death threshold.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.hp <= self.template.death_threshold
    }

    /// Paralysed, or bleeding out below 0 HP.
    #[must_use]
    pub fn is_incapacitated(&self) -> bool {
        self.has(ConditionKind::Paralyzed) || self.hp < 0
    }

    /// Inside another creature's stomach.
    #[must_use]
    pub fn is_swallowed(&self) -> bool {
        self.has(ConditionKind::Swallowed)
    }

    /// Alive and on the battlefield.
    #[must_use]
    pub fn is_targetable(&self) -> bool {
        !self.is_dead() && !self.is_swallowed()
    }

    /// Restore up to `amount` HP, never above the maximum. Returns HP gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount.max(0)).min(self.max_hp).max(before);
        self.hp - before
    }

    /// Lower the HP maximum by `amount`, dragging current HP down with it.
    pub fn drain_max_hp(&mut self, amount: i32) {
        self.max_hp = (self.max_hp - amount.max(0)).max(0);
        self.hp = self.hp.min(self.max_hp);
    }

    // -------------------------------------------------------------------------
    // Abilities and defences
    // -------------------------------------------------------------------------

    /// Ability modifier.
    #[must_use]
    pub fn modifier(&self, ability: Ability) -> i32 {
        self.template.scores.modifier(ability)
    }

    /// Raw ability score.
    #[must_use]
    pub fn score(&self, ability: Ability) -> i32 {
        self.template.scores.score(ability)
    }

    /// Saving throw bonus: the better of the modifier and any declared bonus.
    #[must_use]
    pub fn save_bonus(&self, ability: Ability) -> i32 {
        let base = self.modifier(ability);
        self.template
            .save_override(ability)
            .map_or(base, |declared| declared.max(base))
    }

    /// Armour class including the transient bonus.
    #[must_use]
    pub fn armor_class(&self) -> i32 {
        self.template.ac + self.ac_bonus
    }

    /// Damage-type defences.
    #[must_use]
    pub const fn defenses(&self) -> &Defenses {
        &self.defenses
    }

    /// Damage types taken since this creature's last turn began.
    #[must_use]
    pub const fn damage_taken_types(&self) -> DamageTypes {
        self.damage_taken
    }

    pub(crate) fn record_damage_type(&mut self, kind: DamageType) {
        self.damage_taken |= kind.flag();
    }

    pub(crate) fn clear_damage_taken(&mut self) {
        self.damage_taken = DamageTypes::empty();
    }

    // -------------------------------------------------------------------------
    // Advantage
    // -------------------------------------------------------------------------

    /// Effective advantage for `kind`: passive grants stacked with condition
    /// penalties.
    #[must_use]
    pub fn advantage(&self, kind: RollKind) -> Advantage {
        self.passive_advantage
            .combined(&self.conditions.penalties())
            .get(kind)
    }

    pub(crate) fn reset_passive_advantage(&mut self) {
        self.passive_advantage = AdvantageTable::default();
    }

    pub(crate) fn grant_passive_advantage(&mut self, kind: RollKind, delta: Advantage) {
        self.passive_advantage.adjust(kind, delta);
    }

    // -------------------------------------------------------------------------
    // Conditions
    // -------------------------------------------------------------------------

    /// The condition slots.
    #[must_use]
    pub const fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    pub(crate) fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }

    /// True when `kind` is on.
    #[must_use]
    pub const fn has(&self, kind: ConditionKind) -> bool {
        self.conditions.is_on(kind)
    }

    /// Whether the creature is immune to `kind`.
    #[must_use]
    pub fn is_immune_to(&self, kind: ConditionKind) -> bool {
        self.condition_immunities.has(kind)
    }

    /// Turn a condition on. Returns false, changing nothing, when immune.
    ///
    /// Conditions that pin the creature drop both speeds and the remaining
    /// movement to 0.
    pub fn apply_condition(&mut self, kind: ConditionKind, state: ConditionState) -> bool {
        if self.is_immune_to(kind) {
            return false;
        }
        self.conditions.set(kind, state);
        if kind.immobilizes() {
            self.speed = Speeds::STILL;
            self.movement = 0;
        }
        true
    }

    /// Turn a condition off. Speed returns to the template maximum once
    /// nothing else pins the creature.
    pub fn clear_condition(&mut self, kind: ConditionKind) -> Option<ConditionState> {
        let cleared = self.conditions.clear(kind);
        if cleared.is_some() && !self.conditions.immobilized() {
            self.speed = self.template.speed;
        }
        cleared
    }

    // -------------------------------------------------------------------------
    // Movement
    // -------------------------------------------------------------------------

    /// Current speeds; both 0 while pinned.
    #[must_use]
    pub const fn speed(&self) -> Speeds {
        self.speed
    }

    /// True if the template can fly, even while currently pinned.
    #[must_use]
    pub fn can_fly(&self) -> bool {
        self.template.speed.can_fly()
    }

    /// Movement points left this turn, in feet.
    #[must_use]
    pub const fn movement(&self) -> i32 {
        self.movement
    }

    /// Overwrite the movement points left this turn.
    pub fn set_movement(&mut self, feet: i32) {
        self.movement = feet.max(0);
    }

    /// Start-of-turn movement refill.
    pub fn refill_movement(&mut self) {
        self.movement = self.speed.budget();
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Template actions paired with their slots.
    pub fn actions(&self) -> impl Iterator<Item = (usize, &Action, &ActionSlot)> + '_ {
        self.template
            .actions
            .iter()
            .zip(&self.slots)
            .enumerate()
            .map(|(i, (a, s))| (i, a, s))
    }

    /// Template action at `index`.
    #[must_use]
    pub fn action(&self, index: usize) -> Option<&Action> {
        self.template.actions.get(index)
    }

    /// Bookkeeping of the action at `index`.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&ActionSlot> {
        self.slots.get(index)
    }

    /// Consume one use of the action at `index`.
    pub(crate) fn spend_action(&mut self, index: usize) {
        if let (Some(action), Some(slot)) =
            (self.template.actions.get(index), self.slots.get_mut(index))
        {
            slot.spend(action);
        }
    }

    /// Longest reach among the creature's actions, 5 ft with none.
    #[must_use]
    pub fn max_reach(&self) -> i32 {
        self.template
            .actions
            .iter()
            .map(|a| a.reach)
            .max()
            .unwrap_or(lattice::FEET_PER_CELL)
    }

    /// Refill per-turn uses and roll recharges. Returns the names of the
    /// abilities that came back.
    pub fn start_turn_actions(&mut self, rng: &mut dyn RandomSource) -> Vec<String> {
        self.on_hit_spent = false;
        let mut recharged = Vec::new();
        for (action, slot) in self.template.actions.iter().zip(self.slots.iter_mut()) {
            slot.uses_left = action.uses_per_turn;
            if slot.charged {
                continue;
            }
            if let Some(at) = action.recharge {
                if rng.roll_die(6) >= at {
                    slot.charged = true;
                    recharged.push(action.name.clone());
                }
            }
        }
        recharged
    }

    pub(crate) const fn on_hit_bonus_spent(&self) -> bool {
        self.on_hit_spent
    }

    pub(crate) fn spend_on_hit_bonus(&mut self) {
        self.on_hit_spent = true;
    }

    // -------------------------------------------------------------------------
    // Initiative
    // -------------------------------------------------------------------------

    /// Current initiative.
    #[must_use]
    pub const fn initiative(&self) -> Initiative {
        self.initiative
    }

    /// Roll d20 + dexterity modifier and store the tie-broken result.
    #[allow(clippy::cast_possible_truncation)]
    pub fn roll_initiative(&mut self, rng: &mut dyn RandomSource) -> Initiative {
        let die = i32::try_from(d20(rng, Advantage::NORMAL)).unwrap_or(20);
        self.initiative = Initiative {
            roll: die + self.modifier(Ability::Dex),
            dexterity: self.score(Ability::Dex),
            cr_milli: (self.template.cr * 1000.0).round() as i32,
        };
        self.initiative
    }

    // -------------------------------------------------------------------------
    // Stomach
    // -------------------------------------------------------------------------

    /// Creatures currently swallowed by this one.
    #[must_use]
    pub fn stomach(&self) -> &[CombatantId] {
        &self.stomach
    }

    /// Whether another creature fits in the stomach.
    #[must_use]
    pub fn has_stomach_room(&self) -> bool {
        self.template
            .stomach
            .is_some_and(|cap| self.stomach.len() < cap as usize)
    }

    pub(crate) fn swallow(&mut self, victim: CombatantId) {
        self.stomach.push(victim);
    }

    pub(crate) fn release(&mut self, victim: CombatantId) {
        self.stomach.retain(|v| *v != victim);
    }

    pub(crate) fn take_stomach(&mut self) -> Vec<CombatantId> {
        std::mem::take(&mut self.stomach)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::tests::helpers::{brute, stat_block};

    mod identity_tests {
        use super::*;

        #[test]
        fn ids_order_side_then_slot() {
            let a1 = CombatantId::new(Side::A, 1);
            let b0 = CombatantId::new(Side::B, 0);
            assert!(a1 < b0);
            assert_eq!(a1.to_string(), "A1");
            assert_eq!(Side::A.opponent(), Side::B);
        }

        #[test]
        fn initiative_breaks_ties_on_dexterity() {
            let quick = Initiative {
                roll: 12,
                dexterity: 15,
                cr_milli: 250,
            };
            let slow = Initiative {
                roll: 12,
                dexterity: 12,
                cr_milli: 3000,
            };
            assert!(quick > slow);
            assert!((quick.as_decimal() - 12.15025).abs() < 1e-9);
        }
    }

    mod condition_tests {
        use super::*;

        #[test]
        fn pinning_conditions_zero_speed_until_all_cleared() {
            let mut c = brute("Ogre", 30, 12);
            assert!(c.apply_condition(ConditionKind::Grappled, ConditionState::default()));
            assert!(c.apply_condition(ConditionKind::Restrained, ConditionState::default()));
            assert_eq!(c.speed(), Speeds::STILL);
            c.clear_condition(ConditionKind::Grappled);
            assert_eq!(c.speed(), Speeds::STILL);
            c.clear_condition(ConditionKind::Restrained);
            assert_eq!(c.speed(), Speeds::walking(30));
        }

        #[test]
        fn immunity_blocks_condition_every_time() {
            let mut block = stat_block("Skeleton", 13, 13);
            block.condition_immunities = vec![ConditionKind::Poisoned];
            let mut c = Creature::new(Arc::new(block));
            for _ in 0..3 {
                assert!(!c.apply_condition(ConditionKind::Poisoned, ConditionState::default()));
            }
            assert!(!c.has(ConditionKind::Poisoned));
        }

        #[test]
        fn penalties_and_grants_stack_to_one_step() {
            let mut c = brute("Wolf", 11, 13);
            c.grant_passive_advantage(RollKind::Hit, Advantage::ADVANTAGE);
            c.grant_passive_advantage(RollKind::Hit, Advantage::ADVANTAGE);
            assert_eq!(c.advantage(RollKind::Hit), Advantage::ADVANTAGE);
            c.apply_condition(ConditionKind::Prone, ConditionState::default());
            assert_eq!(c.advantage(RollKind::Hit), Advantage::NORMAL);
            c.clear_condition(ConditionKind::Prone);
            assert_eq!(c.advantage(RollKind::Hit), Advantage::ADVANTAGE);
        }

        #[test]
        fn incapacitated_below_zero_but_not_at_zero() {
            let mut c = brute("Troll", 84, 15);
            c.hp = 0;
            assert!(!c.is_incapacitated());
            c.hp = -1;
            assert!(c.is_incapacitated());
        }
    }

    mod action_tests {
        use super::*;
        use crate::action::{Action, DamageTerm};
        use crate::damage::DamageType;

        fn breather() -> Creature {
            let mut block = stat_block("Drake", 30, 13);
            block.actions = vec![
                Action::melee(
                    "Bite",
                    4,
                    vec![DamageTerm::new("1d6".parse().unwrap(), DamageType::Piercing)],
                ),
                Action::ranged("Breath", 0, 15, vec![]).special().with_recharge(5),
                Action::ranged("Spit", 3, 30, vec![]).with_ammo(1).with_uses_per_turn(1),
            ];
            Creature::new(Arc::new(block))
        }

        #[test]
        fn recharge_needs_high_d6() {
            let mut c = breather();
            c.spend_action(1);
            assert!(!c.slot(1).unwrap().is_ready());
            let mut dice = ScriptedDice::new([4]);
            assert!(c.start_turn_actions(&mut dice).is_empty());
            let mut dice = ScriptedDice::new([5]);
            assert_eq!(c.start_turn_actions(&mut dice), vec!["Breath".to_string()]);
            assert!(c.slot(1).unwrap().is_ready());
        }

        #[test]
        fn ammo_runs_out_for_good() {
            let mut c = breather();
            c.spend_action(2);
            let mut dice = ScriptedDice::new(Vec::<u32>::new());
            c.start_turn_actions(&mut dice);
            assert_eq!(c.slot(2).unwrap().uses_left, Some(1));
            assert!(!c.slot(2).unwrap().is_ready());
        }

        #[test]
        fn max_reach_is_longest_action() {
            assert_eq!(breather().max_reach(), 30);
        }
    }

    mod save_tests {
        use super::*;

        #[test]
        fn declared_save_only_counts_when_better() {
            let mut block = stat_block("Giant", 126, 17);
            block.scores = AbilityScores::new(23, 15, 20, 10, 12, 9);
            block.saves = vec![
                SaveBonus {
                    ability: Ability::Dex,
                    bonus: 5,
                },
                SaveBonus {
                    ability: Ability::Str,
                    bonus: 2,
                },
            ];
            let c = Creature::new(Arc::new(block));
            assert_eq!(c.save_bonus(Ability::Dex), 5);
            assert_eq!(c.save_bonus(Ability::Str), 6);
            assert_eq!(c.save_bonus(Ability::Wis), 1);
        }

        #[test]
        fn heal_caps_at_maximum_and_drain_lowers_it() {
            let mut c = brute("Troll", 84, 15);
            c.hp = 80;
            assert_eq!(c.heal(10), 4);
            c.drain_max_hp(20);
            assert_eq!(c.max_hp, 64);
            assert_eq!(c.hp, 64);
        }
    }
}
