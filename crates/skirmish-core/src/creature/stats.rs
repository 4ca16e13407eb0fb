//! Stat blocks: the immutable template data a creature is built from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::conditions::ConditionKind;
use crate::damage::DamageType;
use crate::passive::Passive;

/// One of the six ability scores.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    /// Strength
    #[default]
    Str,
    /// Dexterity
    Dex,
    /// Constitution
    Con,
    /// Intelligence
    Int,
    /// Wisdom
    Wis,
    /// Charisma
    Cha,
}

impl Ability {
    /// All abilities in table order.
    pub const ALL: [Self; 6] = [Self::Str, Self::Dex, Self::Con, Self::Int, Self::Wis, Self::Cha];

    /// Position of this ability in per-ability tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Three-letter abbreviation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Dex => "dex",
            Self::Con => "con",
            Self::Int => "int",
            Self::Wis => "wis",
            Self::Cha => "cha",
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six raw ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbilityScores {
    /// Strength score
    #[serde(rename = "str")]
    pub strength: i32,
    /// Dexterity score
    #[serde(rename = "dex")]
    pub dexterity: i32,
    /// Constitution score
    #[serde(rename = "con")]
    pub constitution: i32,
    /// Intelligence score
    #[serde(rename = "int")]
    pub intelligence: i32,
    /// Wisdom score
    #[serde(rename = "wis")]
    pub wisdom: i32,
    /// Charisma score
    #[serde(rename = "cha")]
    pub charisma: i32,
}

impl AbilityScores {
    /// Scores given in table order.
    #[must_use]
    pub const fn new(str: i32, dex: i32, con: i32, int: i32, wis: i32, cha: i32) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    /// The raw score for `ability`.
    #[must_use]
    pub const fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Str => self.strength,
            Ability::Dex => self.dexterity,
            Ability::Con => self.constitution,
            Ability::Int => self.intelligence,
            Ability::Wis => self.wisdom,
            Ability::Cha => self.charisma,
        }
    }

    /// The derived modifier, `floor((score - 10) / 2)`.
    #[must_use]
    pub const fn modifier(&self, ability: Ability) -> i32 {
        (self.score(ability) - 10).div_euclid(2)
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// Size category. Ordered from smallest to largest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    /// Cats, rats
    Tiny,
    /// Goblins, kobolds
    Small,
    /// Humans, wolves
    #[default]
    Medium,
    /// Owlbears, ogres
    Large,
    /// Giants
    Huge,
    /// Dragons of legend
    Gargantuan,
}

/// Creature category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatureType {
    /// Natural animals
    #[default]
    Beast,
    /// Fiends, nightmares
    Fiend,
    /// Giants and ogres
    Giant,
    /// Goblins, kobolds
    Humanoid,
    /// Owlbears, minotaurs
    Monstrosity,
    /// Skeletons, zombies, ghouls
    Undead,
}

/// Movement speeds in feet per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Speeds {
    /// Walking speed
    pub ground: i32,
    /// Flying speed, 0 for creatures that cannot fly
    #[serde(default)]
    pub fly: i32,
}

impl Speeds {
    /// Both modes pinned to 0.
    pub const STILL: Self = Self { ground: 0, fly: 0 };

    /// Walking only.
    #[must_use]
    pub const fn walking(ground: i32) -> Self {
        Self { ground, fly: 0 }
    }

    /// True for creatures with a fly speed.
    #[must_use]
    pub const fn can_fly(&self) -> bool {
        self.fly > 0
    }

    /// Movement points available in a turn: the better of the two modes.
    #[must_use]
    pub fn budget(&self) -> i32 {
        self.ground.max(self.fly)
    }
}

/// A declared saving-throw bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveBonus {
    /// Which save
    pub ability: Ability,
    /// Total bonus to the roll
    pub bonus: i32,
}

/// Immutable template a creature is instantiated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    /// Template name, e.g. "Wolf"
    pub name: String,
    /// Creature category
    #[serde(default)]
    pub category: CreatureType,
    /// Size category
    #[serde(default)]
    pub size: Size,
    /// Challenge rating
    pub cr: f32,
    /// Armour class
    pub ac: i32,
    /// Hit point maximum
    pub hp: i32,
    /// HP at or below which the creature is dead
    #[serde(default)]
    pub death_threshold: i32,
    /// Movement speeds
    pub speed: Speeds,
    /// Ability scores
    #[serde(default)]
    pub scores: AbilityScores,
    /// Save bonuses overriding the plain modifier when higher
    #[serde(default)]
    pub saves: Vec<SaveBonus>,
    /// Damage types halved
    #[serde(default)]
    pub resistances: Vec<DamageType>,
    /// Damage types ignored
    #[serde(default)]
    pub immunities: Vec<DamageType>,
    /// Damage types doubled
    #[serde(default)]
    pub vulnerabilities: Vec<DamageType>,
    /// Conditions that can never be applied
    #[serde(default)]
    pub condition_immunities: Vec<ConditionKind>,
    /// Attack actions taken each turn
    #[serde(default = "default_attacks")]
    pub attacks_per_round: u32,
    /// Weapons and special abilities
    pub actions: Vec<Action>,
    /// Passive abilities
    #[serde(default)]
    pub passives: Vec<Passive>,
    /// How many creatures can be swallowed at once
    #[serde(default)]
    pub stomach: Option<u32>,
    /// Behavior strategy id; the standard behavior when absent
    #[serde(default)]
    pub behavior: Option<String>,
}

const fn default_attacks() -> u32 {
    1
}

impl StatBlock {
    /// Declared override for a save, if any.
    #[must_use]
    pub fn save_override(&self, ability: Ability) -> Option<i32> {
        self.saves
            .iter()
            .filter(|s| s.ability == ability)
            .map(|s| s.bonus)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod ability_tests {
        use super::*;

        #[test]
        fn modifiers_round_down() {
            let s = AbilityScores::new(3, 8, 9, 10, 11, 20);
            assert_eq!(s.modifier(Ability::Str), -4);
            assert_eq!(s.modifier(Ability::Dex), -1);
            assert_eq!(s.modifier(Ability::Con), -1);
            assert_eq!(s.modifier(Ability::Int), 0);
            assert_eq!(s.modifier(Ability::Wis), 0);
            assert_eq!(s.modifier(Ability::Cha), 5);
        }

        #[test]
        fn indices_follow_table_order() {
            for (i, a) in Ability::ALL.into_iter().enumerate() {
                assert_eq!(a.index(), i);
            }
        }

        #[test]
        fn scores_use_short_keys() {
            let s: AbilityScores = serde_json::from_str(
                r#"{"str":12,"dex":15,"con":12,"int":3,"wis":12,"cha":6}"#,
            )
            .unwrap();
            assert_eq!(s.score(Ability::Dex), 15);
            assert_eq!(s.modifier(Ability::Int), -4);
        }
    }

    mod speed_tests {
        use super::*;

        #[test]
        fn budget_takes_best_mode() {
            assert_eq!(Speeds::walking(30).budget(), 30);
            assert_eq!(Speeds { ground: 60, fly: 90 }.budget(), 90);
            assert!(!Speeds::walking(30).can_fly());
        }

        #[test]
        fn sizes_are_ordered() {
            assert!(Size::Medium <= Size::Large);
            assert!(Size::Huge > Size::Large);
        }
    }
}
