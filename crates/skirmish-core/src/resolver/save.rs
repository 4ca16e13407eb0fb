//! Saving throws.

use crate::conditions::{ConditionKind, RollKind};
use crate::creature::{Ability, Creature};
use crate::dice::{d20, RandomSource};

/// Result of one saving throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    /// The d20 kept, 0 when the save failed without a roll
    pub roll: u32,
    /// Roll plus save bonus
    pub total: i32,
    /// Whether the total met the DC
    pub success: bool,
}

impl SaveOutcome {
    const AUTO_FAIL: Self = Self {
        roll: 0,
        total: 0,
        success: false,
    };
}

/// Roll `creature`'s `ability` save against `dc`.
///
/// A paralysed creature fails strength and dexterity saves without rolling.
/// Otherwise the d20 is rolled under the creature's advantage for that save.
pub fn saving_throw(
    creature: &Creature,
    ability: Ability,
    dc: i32,
    rng: &mut dyn RandomSource,
) -> SaveOutcome {
    if creature.has(ConditionKind::Paralyzed) && matches!(ability, Ability::Str | Ability::Dex) {
        return SaveOutcome::AUTO_FAIL;
    }
    let roll = d20(rng, creature.advantage(RollKind::Save(ability)));
    let total = i32::try_from(roll).unwrap_or(20) + creature.save_bonus(ability);
    SaveOutcome {
        roll,
        total,
        success: total >= dc,
    }
}
