//! Damage types and mitigation.
//!
//! Each creature carries three damage-type sets. Mitigation applies them to a
//! single rolled amount:
//!
//! 1. Immunity wins outright: the amount becomes 0.
//! 2. Resistance halves, rounding down.
//! 3. Vulnerability doubles whatever resistance left.
//!
//! A creature both resistant and vulnerable to a type therefore takes
//! `floor(raw / 2) * 2`.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A single damage type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    /// Clubs, falls, collisions.
    Bludgeoning,
    /// Fangs, arrows, spears.
    Piercing,
    /// Claws, blades.
    Slashing,
    /// Corrosion.
    Acid,
    /// Frost.
    Cold,
    /// Flame.
    Fire,
    /// Pure magical energy.
    Force,
    /// Electricity.
    Lightning,
    /// Life-draining energy.
    Necrotic,
    /// Venom and toxins.
    Poison,
    /// Mind-rending energy.
    Psychic,
    /// Holy light.
    Radiant,
    /// Concussive sound.
    Thunder,
}

impl DamageType {
    /// Every damage type, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::Bludgeoning,
        Self::Piercing,
        Self::Slashing,
        Self::Acid,
        Self::Cold,
        Self::Fire,
        Self::Force,
        Self::Lightning,
        Self::Necrotic,
        Self::Poison,
        Self::Psychic,
        Self::Radiant,
        Self::Thunder,
    ];

    /// The set containing only this type.
    #[must_use]
    pub const fn flag(self) -> DamageTypes {
        match self {
            Self::Bludgeoning => DamageTypes::BLUDGEONING,
            Self::Piercing => DamageTypes::PIERCING,
            Self::Slashing => DamageTypes::SLASHING,
            Self::Acid => DamageTypes::ACID,
            Self::Cold => DamageTypes::COLD,
            Self::Fire => DamageTypes::FIRE,
            Self::Force => DamageTypes::FORCE,
            Self::Lightning => DamageTypes::LIGHTNING,
            Self::Necrotic => DamageTypes::NECROTIC,
            Self::Poison => DamageTypes::POISON,
            Self::Psychic => DamageTypes::PSYCHIC,
            Self::Radiant => DamageTypes::RADIANT,
            Self::Thunder => DamageTypes::THUNDER,
        }
    }

    /// Lowercase tag as written in stat blocks.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bludgeoning => "bludgeoning",
            Self::Piercing => "piercing",
            Self::Slashing => "slashing",
            Self::Acid => "acid",
            Self::Cold => "cold",
            Self::Fire => "fire",
            Self::Force => "force",
            Self::Lightning => "lightning",
            Self::Necrotic => "necrotic",
            Self::Poison => "poison",
            Self::Psychic => "psychic",
            Self::Radiant => "radiant",
            Self::Thunder => "thunder",
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// A set of damage types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DamageTypes: u16 {
        /// Bludgeoning damage
        const BLUDGEONING = 1 << 0;
        /// Piercing damage
        const PIERCING = 1 << 1;
        /// Slashing damage
        const SLASHING = 1 << 2;
        /// Acid damage
        const ACID = 1 << 3;
        /// Cold damage
        const COLD = 1 << 4;
        /// Fire damage
        const FIRE = 1 << 5;
        /// Force damage
        const FORCE = 1 << 6;
        /// Lightning damage
        const LIGHTNING = 1 << 7;
        /// Necrotic damage
        const NECROTIC = 1 << 8;
        /// Poison damage
        const POISON = 1 << 9;
        /// Psychic damage
        const PSYCHIC = 1 << 10;
        /// Radiant damage
        const RADIANT = 1 << 11;
        /// Thunder damage
        const THUNDER = 1 << 12;
    }
}

impl DamageTypes {
    /// True when `kind` is in the set.
    #[must_use]
    pub fn has(self, kind: DamageType) -> bool {
        self.contains(kind.flag())
    }
}

impl FromIterator<DamageType> for DamageTypes {
    fn from_iter<I: IntoIterator<Item = DamageType>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |acc, kind| acc | kind.flag())
    }
}

/// A creature's damage-type defences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Defenses {
    /// Types that deal no damage
    pub immunities: DamageTypes,
    /// Types that deal half damage
    pub resistances: DamageTypes,
    /// Types that deal double damage
    pub vulnerabilities: DamageTypes,
}

impl Defenses {
    /// Apply these defences to `raw` damage of type `kind`.
    ///
    /// Negative amounts are treated as 0.
    #[must_use]
    pub fn mitigate(&self, raw: i32, kind: DamageType) -> i32 {
        let mut amount = raw.max(0);
        if self.immunities.has(kind) {
            return 0;
        }
        if self.resistances.has(kind) {
            amount /= 2;
        }
        if self.vulnerabilities.has(kind) {
            amount = amount.saturating_mul(2);
        }
        amount
    }
}
