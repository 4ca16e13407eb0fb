//! Actions: weapons and special abilities behind one shape.
//!
//! An [`Action`] is pure data. It may carry an attack bonus (rolled against
//! AC), a saving throw (rolled by the target), one or more damage terms, and
//! secondary effects that fire only on a hit that leaves the target alive.
//! Melee weapons, bows, breath weapons and grappling bites are all actions.
//!
//! Per-creature bookkeeping (ammo left, uses left this turn, whether a
//! recharging ability is ready) lives in
//! [`ActionSlot`](crate::creature::ActionSlot), not here.

use serde::{Deserialize, Serialize};

use crate::conditions::{ConditionEffect, ConditionKind};
use crate::creature::{Ability, Size};
use crate::damage::DamageType;
use crate::dice::DiceFormula;

/// Preference group used by weapon selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionGroup {
    /// Everyday weapons
    #[default]
    Basic,
    /// Signature abilities, preferred when available
    Special,
}

/// A save with a fixed DC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveCheck {
    /// Ability rolled
    pub ability: Ability,
    /// Target number
    pub dc: i32,
}

/// A save that scales damage and may inflict a condition on failure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaveSpec {
    /// Ability rolled
    pub ability: Ability,
    /// Target number
    pub dc: i32,
    /// Damage multiplier on a successful save
    #[serde(default = "half")]
    pub on_success: f32,
    /// Condition inflicted on a failed save
    #[serde(default)]
    pub on_fail: Option<ConditionEffect>,
}

const fn half() -> f32 {
    0.5
}

impl SaveSpec {
    /// A save for half damage with no condition.
    #[must_use]
    pub const fn half(ability: Ability, dc: i32) -> Self {
        Self {
            ability,
            dc,
            on_success: 0.5,
            on_fail: None,
        }
    }

    /// Inflict `effect` when the save fails.
    #[must_use]
    pub const fn with_on_fail(mut self, effect: ConditionEffect) -> Self {
        self.on_fail = Some(effect);
        self
    }

    /// Scale damage by the success multiplier, rounding down.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn scale(&self, amount: i32) -> i32 {
        (f64::from(amount) * f64::from(self.on_success)).floor() as i32
    }
}

/// One dice formula and the type of damage it deals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageTerm {
    /// What to roll
    pub dice: DiceFormula,
    /// Damage type
    #[serde(rename = "type")]
    pub kind: DamageType,
    /// A save rolled for this term alone, overriding the action's save
    #[serde(default)]
    pub save: Option<SaveSpec>,
}

impl DamageTerm {
    /// A term with no save of its own.
    #[must_use]
    pub const fn new(dice: DiceFormula, kind: DamageType) -> Self {
        Self {
            dice,
            kind,
            save: None,
        }
    }

    /// Give this term its own save.
    #[must_use]
    pub const fn with_save(mut self, save: SaveSpec) -> Self {
        self.save = Some(save);
        self
    }
}

/// Secondary effect of a successful hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum OnHit {
    /// Inflict a condition, unless the target makes the resisting save.
    Condition {
        /// Condition to inflict
        apply: ConditionEffect,
        /// Save that avoids it
        #[serde(default)]
        resist: Option<SaveCheck>,
    },
    /// Shove the target directly away from the attacker.
    Knockback {
        /// Feet pushed
        distance: i32,
        /// Save that avoids it
        #[serde(default)]
        resist: Option<SaveCheck>,
    },
    /// Swallow a target no larger than `max_size`.
    Swallow {
        /// Largest size that fits
        max_size: Size,
        /// Damage dealt at the start of each of the swallower's turns
        #[serde(default)]
        digest: Option<DamageTerm>,
    },
    /// Reduce the target's hit point maximum by the damage dealt.
    DrainMaxHp,
}

impl OnHit {
    /// Inflict `kind` with no resisting save.
    #[must_use]
    pub const fn condition(apply: ConditionEffect) -> Self {
        Self::Condition {
            apply,
            resist: None,
        }
    }

    /// Knock the target prone unless it passes `resist`.
    #[must_use]
    pub const fn knock_prone(resist: SaveCheck) -> Self {
        Self::Condition {
            apply: ConditionEffect::plain(ConditionKind::Prone),
            resist: Some(resist),
        }
    }
}

/// A weapon or special ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Display name
    pub name: String,
    /// Basic or special
    #[serde(default)]
    pub group: ActionGroup,
    /// Attack bonus; `None` for save-only effects that always land
    #[serde(default)]
    pub to_hit: Option<i32>,
    /// Save applied to every damage term without its own
    #[serde(default)]
    pub save: Option<SaveSpec>,
    /// Damage terms
    #[serde(default)]
    pub damage: Vec<DamageTerm>,
    /// Maximum range in feet
    #[serde(default = "melee_reach")]
    pub reach: i32,
    /// Minimum range in feet
    #[serde(default)]
    pub min_range: i32,
    /// Ranged attacks suffer when an enemy is adjacent
    #[serde(default)]
    pub ranged: bool,
    /// Shots available for the whole encounter
    #[serde(default)]
    pub ammo: Option<u32>,
    /// Uses allowed per turn
    #[serde(default)]
    pub uses_per_turn: Option<u32>,
    /// Spent on use; recharges on a d6 roll at or above this value
    #[serde(default)]
    pub recharge: Option<u32>,
    /// Effects of a successful hit
    #[serde(default)]
    pub on_hit: Vec<OnHit>,
}

const fn melee_reach() -> i32 {
    5
}

impl Action {
    /// A basic melee attack.
    #[must_use]
    pub fn melee(name: impl Into<String>, to_hit: i32, damage: Vec<DamageTerm>) -> Self {
        Self {
            name: name.into(),
            group: ActionGroup::Basic,
            to_hit: Some(to_hit),
            save: None,
            damage,
            reach: melee_reach(),
            min_range: 0,
            ranged: false,
            ammo: None,
            uses_per_turn: None,
            recharge: None,
            on_hit: Vec::new(),
        }
    }

    /// A basic ranged attack reaching `reach` feet.
    #[must_use]
    pub fn ranged(
        name: impl Into<String>,
        to_hit: i32,
        reach: i32,
        damage: Vec<DamageTerm>,
    ) -> Self {
        Self {
            ranged: true,
            reach,
            ..Self::melee(name, to_hit, damage)
        }
    }

    /// Mark the action special.
    #[must_use]
    pub fn special(mut self) -> Self {
        self.group = ActionGroup::Special;
        self
    }

    /// Set the reach in feet.
    #[must_use]
    pub fn with_reach(mut self, reach: i32) -> Self {
        self.reach = reach;
        self
    }

    /// Set a minimum range in feet.
    #[must_use]
    pub fn with_min_range(mut self, min_range: i32) -> Self {
        self.min_range = min_range;
        self
    }

    /// Limit total shots.
    #[must_use]
    pub fn with_ammo(mut self, ammo: u32) -> Self {
        self.ammo = Some(ammo);
        self
    }

    /// Limit uses per turn.
    #[must_use]
    pub fn with_uses_per_turn(mut self, uses: u32) -> Self {
        self.uses_per_turn = Some(uses);
        self
    }

    /// Spend on use, recharging on a d6 at or above `at`.
    #[must_use]
    pub fn with_recharge(mut self, at: u32) -> Self {
        self.recharge = Some(at);
        self
    }

    /// Make every damage term without its own save subject to `save`.
    #[must_use]
    pub fn with_save(mut self, save: SaveSpec) -> Self {
        self.save = Some(save);
        self
    }

    /// Remove the attack roll, making the action always land.
    #[must_use]
    pub fn without_attack_roll(mut self) -> Self {
        self.to_hit = None;
        self
    }

    /// Add a secondary effect.
    #[must_use]
    pub fn with_on_hit(mut self, effect: OnHit) -> Self {
        self.on_hit.push(effect);
        self
    }

    /// True for actions without the ranged flag.
    #[must_use]
    pub const fn is_melee(&self) -> bool {
        !self.ranged
    }

    /// True when a target `distance` feet away can be hit.
    #[must_use]
    pub const fn in_range(&self, distance: i32) -> bool {
        self.min_range <= distance && distance <= self.reach
    }
}
