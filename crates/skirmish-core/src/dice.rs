//! Dice notation, advantage, and pluggable random sources.
//!
//! Every random number the engine consumes comes through [`RandomSource`].
//! Real encounters use [`SeededRng`], so a match is fully reproducible from
//! its seed; tests use [`ScriptedDice`] to force exact die results.
//!
//! # Example
//!
//! ```
//! use skirmish_core::dice::{DiceFormula, ScriptedDice};
//!
//! let bite: DiceFormula = "2d6+3".parse().unwrap();
//! let mut dice = ScriptedDice::new([4, 5]);
//! assert_eq!(bite.roll(&mut dice), 12);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Random Sources
// =============================================================================

/// Supplier of uniform die results.
pub trait RandomSource {
    /// A uniform integer in `1..=faces`. A zero-faced die always shows 0.
    fn roll_die(&mut self, faces: u32) -> u32;
}

/// Seeded `ChaCha8` source used for real encounters.
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SeededRng {
    /// Create a source from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The seed this source was created from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRng {
    fn roll_die(&mut self, faces: u32) -> u32 {
        if faces == 0 {
            return 0;
        }
        self.rng.gen_range(1..=faces)
    }
}

/// Pre-recorded die results for tests and replays.
///
/// Results are served in order and clamped to the faces of the die being
/// rolled. Once the script runs out the fallback value is used.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    script: VecDeque<u32>,
    fallback: Option<u32>,
    served: usize,
}

impl ScriptedDice {
    /// Create a script from die results.
    #[must_use]
    pub fn new(results: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: results.into_iter().collect(),
            fallback: None,
            served: 0,
        }
    }

    /// Serve `value` forever once the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, value: u32) -> Self {
        self.fallback = Some(value);
        self
    }

    /// Queue more results after the current script.
    pub fn push(&mut self, results: impl IntoIterator<Item = u32>) {
        self.script.extend(results);
    }

    /// Results not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// How many dice have been rolled so far.
    #[must_use]
    pub const fn served(&self) -> usize {
        self.served
    }
}

impl RandomSource for ScriptedDice {
    /// # Panics
    ///
    /// Panics when the script is exhausted and no fallback was set; a test
    /// that rolls more dice than it scripted is wrong.
    fn roll_die(&mut self, faces: u32) -> u32 {
        if faces == 0 {
            return 0;
        }
        self.served += 1;
        let value = match self.script.pop_front().or(self.fallback) {
            Some(v) => v,
            None => panic!("scripted dice exhausted after {} rolls", self.served - 1),
        };
        value.clamp(1, faces)
    }
}

// =============================================================================
// Advantage
// =============================================================================

/// Advantage state of a roll, always one of -1, 0 or +1.
///
/// Stacking saturates: two sources of disadvantage are still disadvantage,
/// and one advantage cancels one disadvantage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "i8", into = "i8")]
pub struct Advantage(i8);

impl Advantage {
    /// Roll twice, keep the worst.
    pub const DISADVANTAGE: Self = Self(-1);
    /// Roll once.
    pub const NORMAL: Self = Self(0);
    /// Roll twice, keep the best.
    pub const ADVANTAGE: Self = Self(1);

    /// Clamp an arbitrary score into an advantage state.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_score(score: i32) -> Self {
        Self(score.clamp(-1, 1) as i8)
    }

    /// The raw value, -1, 0 or +1.
    #[must_use]
    pub const fn value(self) -> i8 {
        self.0
    }

    /// Add another contribution, saturating at the bounds.
    #[must_use]
    pub fn stack(self, other: Self) -> Self {
        Self::from_score(i32::from(self.0) + i32::from(other.0))
    }
}

impl From<i8> for Advantage {
    fn from(value: i8) -> Self {
        Self::from_score(i32::from(value))
    }
}

impl From<Advantage> for i8 {
    fn from(value: Advantage) -> Self {
        value.0
    }
}

/// Roll a d20, rolling twice and keeping the best or worst under
/// advantage or disadvantage.
pub fn d20(rng: &mut dyn RandomSource, advantage: Advantage) -> u32 {
    let first = rng.roll_die(20);
    match advantage.value() {
        1 => first.max(rng.roll_die(20)),
        -1 => first.min(rng.roll_die(20)),
        _ => first,
    }
}

// =============================================================================
// Dice Formulas
// =============================================================================

/// Reasons a dice string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    /// The string was blank.
    #[error("empty dice formula")]
    Empty,
    /// A component could not be read as a number.
    #[error("malformed dice formula '{0}'")]
    Malformed(String),
    /// Dice with no faces were requested.
    #[error("dice must have at least one face")]
    ZeroFaces,
}

/// A dice expression `XdY+Z`: `count` dice of `faces` sides plus `bonus`.
///
/// A flat amount such as `"4"` has no dice at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceFormula {
    /// Number of dice rolled
    pub count: u32,
    /// Faces per die
    pub faces: u32,
    /// Flat modifier added once
    pub bonus: i32,
}

impl DiceFormula {
    /// Create a formula, rejecting faceless dice.
    ///
    /// # Errors
    ///
    /// Returns [`DiceError::ZeroFaces`] when `count > 0` and `faces == 0`.
    pub fn new(count: u32, faces: u32, bonus: i32) -> Result<Self, DiceError> {
        if count > 0 && faces == 0 {
            return Err(DiceError::ZeroFaces);
        }
        Ok(Self { count, faces, bonus })
    }

    /// A flat amount with no dice.
    #[must_use]
    pub const fn flat(amount: i32) -> Self {
        Self {
            count: 0,
            faces: 0,
            bonus: amount,
        }
    }

    /// Roll the formula once.
    pub fn roll(&self, rng: &mut dyn RandomSource) -> i32 {
        self.roll_scaled(1, rng)
    }

    /// Roll `count * multiplier` dice plus the bonus once.
    ///
    /// Critical hits use a multiplier of 2: the dice double, the bonus does not.
    pub fn roll_scaled(&self, multiplier: u32, rng: &mut dyn RandomSource) -> i32 {
        let dice = self.count.saturating_mul(multiplier);
        let total: i64 = (0..dice).map(|_| i64::from(rng.roll_die(self.faces))).sum();
        i32::try_from(total).unwrap_or(i32::MAX).saturating_add(self.bonus)
    }

    /// Roll the whole formula twice under advantage (keep best) or
    /// disadvantage (keep worst); once otherwise.
    pub fn roll_with(&self, advantage: Advantage, rng: &mut dyn RandomSource) -> i32 {
        let first = self.roll(rng);
        match advantage.value() {
            1 => first.max(self.roll(rng)),
            -1 => first.min(self.roll(rng)),
            _ => first,
        }
    }

    /// Expected value of one roll.
    #[must_use]
    pub fn average(&self) -> f64 {
        f64::from(self.count) * (f64::from(self.faces) + 1.0) / 2.0 + f64::from(self.bonus)
    }

    /// Largest possible result.
    #[must_use]
    pub fn max(&self) -> i64 {
        i64::from(self.count) * i64::from(self.faces) + i64::from(self.bonus)
    }
}

impl FromStr for DiceFormula {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if text.is_empty() {
            return Err(DiceError::Empty);
        }
        let malformed = || DiceError::Malformed(s.to_string());
        let lower = text.to_ascii_lowercase();

        let Some((count, rest)) = lower.split_once('d') else {
            let bonus = lower.parse::<i32>().map_err(|_| malformed())?;
            return Ok(Self::flat(bonus));
        };

        let count = if count.is_empty() {
            1
        } else {
            count.parse::<u32>().map_err(|_| malformed())?
        };

        let (faces, bonus) = match rest.find(&['+', '-'][..]) {
            Some(at) => {
                let (faces, bonus) = rest.split_at(at);
                let bonus = bonus
                    .strip_prefix('+')
                    .unwrap_or(bonus)
                    .parse::<i32>()
                    .map_err(|_| malformed())?;
                (faces, bonus)
            }
            None => (rest, 0),
        };
        let faces = faces.parse::<u32>().map_err(|_| malformed())?;
        Self::new(count, faces, bonus)
    }
}

impl TryFrom<String> for DiceFormula {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DiceFormula> for String {
    fn from(value: DiceFormula) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return write!(f, "{}", self.bonus);
        }
        write!(f, "{}d{}", self.count, self.faces)?;
        match self.bonus {
            0 => Ok(()),
            b if b > 0 => write!(f, "+{b}"),
            b => write!(f, "{b}"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
