//! # Skirmish Core
//!
//! Turn-based tactical combat resolution for two parties of creatures on a
//! 3-D grid.
//!
//! This crate provides the deterministic encounter engine: it runs rounds in
//! initiative order, moves creatures across a [`lattice`] occupancy map,
//! resolves attacks, saves and damage, and tracks conditions until one side
//! is wiped out or the round cap forces a draw.
//!
//! ## Architecture
//!
//! - **Data**: [`StatBlock`](creature::StatBlock) templates loaded through
//!   the [`Bestiary`](bestiary::Bestiary), instantiated as
//!   [`Creature`](creature::Creature)s and mustered into
//!   [`Party`](party::Party)s
//! - **State**: the [`Arena`](arena::Arena) owns both parties and the
//!   occupancy map for one encounter
//! - **Rules**: [`conditions`], [`movement`], [`passive`] and the
//!   [`resolver`] mutate the arena through a per-turn
//!   [`TurnContext`](turn::TurnContext)
//! - **Decisions**: [`Behavior`](behavior::Behavior) strategies pick targets
//!   and weapons; the scheduler depends only on the trait
//! - **Driving**: [`Encounter`](encounter::Encounter) runs one fight,
//!   [`batch`] runs many in parallel
//!
//! ## Usage
//!
//! ```
//! use skirmish_core::bestiary::Bestiary;
//! use skirmish_core::encounter::{Encounter, EncounterConfig};
//!
//! let bestiary = Bestiary::builtin();
//! let report = Encounter::seeded(
//!     ("Wolves", bestiary.spawn_all(&["wolf", "wolf"])?),
//!     ("Ogres", bestiary.spawn_all(&["ogre"])?),
//!     EncounterConfig::default(),
//!     42,
//! )?
//! .finish();
//! println!("{} after {} rounds", report.outcome, report.rounds);
//! # Ok::<(), skirmish_core::SkirmishError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export lattice for grid access
pub use lattice;

pub mod action;
pub mod arena;
pub mod batch;
pub mod behavior;
pub mod behaviors;
pub mod bestiary;
pub mod conditions;
pub mod creature;
pub mod damage;
pub mod dice;
pub mod encounter;
pub mod error;
pub mod movement;
pub mod narration;
pub mod party;
pub mod passive;
pub mod resolver;
pub mod turn;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use arena::Arena;
pub use bestiary::Bestiary;
pub use creature::{CombatantId, Creature, Side, StatBlock};
pub use dice::{DiceFormula, RandomSource, ScriptedDice, SeededRng};
pub use encounter::{run_encounter, Encounter, EncounterConfig, EncounterReport, Outcome};
pub use error::{Result, SkirmishError};
pub use narration::{NarrationSink, Severity};
pub use party::Party;
