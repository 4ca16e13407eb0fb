//! The combat scheduler.
//!
//! An [`Encounter`] owns the arena, the dice and the narration sink, and
//! runs rounds until one party is wiped out or the round cap forces a draw.
//!
//! # Round structure
//!
//! 1. Path traces from the previous round are cleared
//! 2. Turn order is fixed from initiative for the whole round
//! 3. Each creature in order takes its turn, unless it is dead or one side
//!    has already been wiped out
//!
//! # Turn structure
//!
//! 1. **Lift**: the creature leaves the occupancy map
//! 2. **Initial**: initial-phase passives, start-of-turn condition ticks,
//!    digestion of anything it swallowed
//! 3. **Act**: unless dead or incapacitated, on-start passives run and the
//!    behavior strategy takes each of its attacks, followed by at-end
//!    passives
//! 4. **End**: end-of-turn condition saves
//! 5. **Settle**: the creature returns to the map, unless it died or was
//!    swallowed
//!
//! # Determinism
//!
//! Every roll comes from the encounter's [`RandomSource`] and every
//! iteration order is fixed, so a [`SeededRng`] with the same seed replays
//! the same fight; [`Arena::state_hash`] can verify it.
//!
//! # Example
//!
//! ```
//! use skirmish_core::bestiary::Bestiary;
//! use skirmish_core::encounter::{Encounter, EncounterConfig};
//!
//! let bestiary = Bestiary::builtin();
//! let wolves = vec![bestiary.spawn("wolf").unwrap(), bestiary.spawn("wolf").unwrap()];
//! let goblins = vec![bestiary.spawn("goblin").unwrap()];
//!
//! let mut encounter = Encounter::seeded(
//!     ("Wolves", wolves),
//!     ("Goblins", goblins),
//!     EncounterConfig::default(),
//!     7,
//! )
//! .unwrap();
//! let outcome = encounter.run();
//! assert!(encounter.round() <= 100);
//! println!("{outcome}");
//! ```

use std::fmt;
use std::path::Path;

use lattice::GridBounds;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::arena::Arena;
use crate::behavior::BehaviorRegistry;
use crate::conditions;
use crate::creature::{CombatantId, Creature, Side};
use crate::dice::{DiceFormula, RandomSource, SeededRng};
use crate::error::{Result, SkirmishError};
use crate::narration::{NarrationSink, NullSink, Severity};
use crate::party::Party;
use crate::passive;
use crate::resolver;
use crate::turn::TurnContext;

// =============================================================================
// Configuration
// =============================================================================

/// Rules of an encounter. Every field has a default, so a JSON file only
/// needs the values it changes.
///
/// # Example
///
/// ```
/// use skirmish_core::encounter::EncounterConfig;
///
/// let config = EncounterConfig::from_json(r#"{"round_cap": 20}"#).unwrap();
/// assert_eq!(config.round_cap, 20);
/// assert_eq!(config.enemy_cell_penalty, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Rounds fought before the encounter is declared a draw
    pub round_cap: u32,
    /// Extra feet to cross a cell held by an ally
    pub ally_cell_penalty: i32,
    /// Extra feet to cross a cell held by an enemy
    pub enemy_cell_penalty: i32,
    /// Extra feet per enemy next to a crossed cell
    pub adjacent_enemy_penalty: i32,
    /// Bludgeoning damage when a knockback hits an obstruction
    pub collision_damage: i32,
    /// Self-inflicted bludgeoning damage of a fumble
    pub fumble_damage: DiceFormula,
    /// Creatures with this intelligence or less attack the closest enemy
    pub low_intelligence: i32,
    /// Cells between the origin and each party's starting line
    pub formation_offset: i32,
    /// Grid limits
    pub bounds: GridBounds,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            round_cap: 100,
            ally_cell_penalty: 5,
            enemy_cell_penalty: 10,
            adjacent_enemy_penalty: 5,
            collision_damage: 5,
            fumble_damage: DiceFormula {
                count: 1,
                faces: 6,
                bonus: 0,
            },
            low_intelligence: 4,
            formation_offset: 3,
            bounds: GridBounds::default(),
        }
    }
}

impl EncounterConfig {
    /// Parse a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SkirmishError::DataParse`] for malformed JSON or dice.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| SkirmishError::DataParse {
            what: "encounter config".to_string(),
            source,
        })
    }

    /// Read a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SkirmishError::Io`] if the file cannot be read and
    /// [`SkirmishError::DataParse`] if it does not parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SkirmishError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// How an encounter ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// One party still stands.
    Winner {
        /// The winning side
        side: Side,
        /// The winning party's name
        party: String,
    },
    /// The round cap was reached, or both parties fell together.
    Draw,
}

impl Outcome {
    /// Name of the winning party, `None` for a draw.
    #[must_use]
    pub fn winner(&self) -> Option<&str> {
        match self {
            Self::Winner { party, .. } => Some(party),
            Self::Draw => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Winner { party, .. } => write!(f, "{party} win"),
            Self::Draw => f.write_str("draw"),
        }
    }
}

/// Final state of a finished encounter.
#[derive(Debug, Clone)]
pub struct EncounterReport {
    /// How it ended
    pub outcome: Outcome,
    /// Rounds fought
    pub rounds: u32,
    /// Arena state hash at the end
    pub state_hash: u64,
    /// Both parties with their final counters, side A first
    pub parties: [Party; 2],
}

// =============================================================================
// Encounter
// =============================================================================

/// One fight between two parties.
pub struct Encounter {
    arena: Arena,
    behaviors: BehaviorRegistry,
    config: EncounterConfig,
    rng: Box<dyn RandomSource>,
    sink: Box<dyn NarrationSink>,
    round: u32,
    turn: u32,
    outcome: Option<Outcome>,
}

impl fmt::Debug for Encounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encounter")
            .field("arena", &self.arena)
            .field("behaviors", &self.behaviors)
            .field("config", &self.config)
            .field("round", &self.round)
            .field("turn", &self.turn)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

impl Encounter {
    /// Set up an encounter between two mustered parties and deploy them.
    ///
    /// Narration is discarded until a sink is attached with
    /// [`with_sink`](Self::with_sink).
    ///
    /// # Errors
    ///
    /// Returns [`SkirmishError::EmptyParty`] if either party has no members.
    ///
    /// # Panics
    ///
    /// Panics if `a` is not on side A, `b` is not on side B, or a formation
    /// does not fit inside the configured bounds.
    pub fn new(
        a: Party,
        b: Party,
        config: EncounterConfig,
        rng: Box<dyn RandomSource>,
    ) -> Result<Self> {
        for party in [&a, &b] {
            if party.is_empty() {
                return Err(SkirmishError::EmptyParty(party.name().to_string()));
            }
        }
        let mut arena = Arena::new(a, b, config.bounds);
        arena.deploy(config.formation_offset);
        Ok(Self {
            arena,
            behaviors: BehaviorRegistry::with_defaults(),
            config,
            rng,
            sink: Box::new(NullSink),
            round: 0,
            turn: 0,
            outcome: None,
        })
    }

    /// Muster two rosters with a [`SeededRng`] and set up the encounter.
    ///
    /// Initiative is rolled from the same seeded stream that drives the
    /// fight, so the seed alone determines the whole encounter.
    ///
    /// # Errors
    ///
    /// Returns [`SkirmishError::EmptyParty`] if a roster is empty.
    pub fn seeded(
        a: (&str, Vec<Creature>),
        b: (&str, Vec<Creature>),
        config: EncounterConfig,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = SeededRng::new(seed);
        let a = Party::muster(a.0, Side::A, a.1, &mut rng)?;
        let b = Party::muster(b.0, Side::B, b.1, &mut rng)?;
        Self::new(a, b, config, Box::new(rng))
    }

    /// Send narration to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn NarrationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use `behaviors` to resolve stat-block behavior ids.
    #[must_use]
    pub fn with_behaviors(mut self, behaviors: BehaviorRegistry) -> Self {
        self.behaviors = behaviors;
        self
    }

    /// The arena.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Mutable arena, for setting up scenarios before the first round.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// The rules in force.
    #[must_use]
    pub const fn config(&self) -> &EncounterConfig {
        &self.config
    }

    /// Rounds started so far.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// The outcome, once decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Run one round. Returns the outcome once the encounter is over.
    pub fn step_round(&mut self) -> Option<Outcome> {
        if self.outcome.is_none() {
            self.outcome = self.decide();
        }
        if let Some(outcome) = &self.outcome {
            return Some(outcome.clone());
        }

        self.round += 1;
        self.arena.grid_mut().clear_traces();
        debug!(round = self.round, "round started");
        let round = self.round;
        let mut ctx = TurnContext::new(self.rng.as_mut(), self.sink.as_mut(), &self.config);
        ctx.round = round;
        ctx.narrate(Severity::Action, || format!("Round {round}"));

        for id in self.arena.turn_order() {
            if !self.arena.both_sides_alive() {
                break;
            }
            if self.arena[id].is_dead() {
                continue;
            }
            self.turn += 1;
            self.take_turn(id);
        }

        self.outcome = self.decide();
        self.outcome.clone()
    }

    /// Run rounds until the encounter ends.
    pub fn run(&mut self) -> Outcome {
        info!(
            team_a = self.arena.party(Side::A).name(),
            team_b = self.arena.party(Side::B).name(),
            "encounter started"
        );
        loop {
            if let Some(outcome) = self.step_round() {
                return outcome;
            }
        }
    }

    /// Run to the end and hand back the final state.
    #[must_use]
    pub fn finish(mut self) -> EncounterReport {
        let outcome = self.run();
        EncounterReport {
            outcome,
            rounds: self.round,
            state_hash: self.arena.state_hash(),
            parties: self.arena.into_parties(),
        }
    }

    /// The outcome if the encounter is over now.
    fn decide(&mut self) -> Option<Outcome> {
        let alive = Side::BOTH.map(|side| self.arena.party(side).is_alive());
        let outcome = match alive {
            [true, true] if self.round < self.config.round_cap => return None,
            [true, false] => self.winner(Side::A),
            [false, true] => self.winner(Side::B),
            _ => Outcome::Draw,
        };
        info!(outcome = %outcome, rounds = self.round, "encounter finished");
        let mut ctx = TurnContext::new(self.rng.as_mut(), self.sink.as_mut(), &self.config);
        ctx.round = self.round;
        let rounds = self.round;
        ctx.narrate(Severity::Summary, || match &outcome {
            Outcome::Winner { party, .. } => format!("{party} win in round {rounds}."),
            Outcome::Draw => format!("Draw in round {rounds}."),
        });
        Some(outcome)
    }

    fn winner(&self, side: Side) -> Outcome {
        Outcome::Winner {
            side,
            party: self.arena.party(side).name().to_string(),
        }
    }

    /// One creature's turn.
    ///
    /// # Panics
    ///
    /// Panics if `id` is dead; the round loop skips the dead.
    fn take_turn(&mut self, id: CombatantId) {
        let Self {
            arena,
            behaviors,
            config,
            rng,
            sink,
            round,
            turn,
            ..
        } = self;
        assert!(!arena[id].is_dead(), "dead creature {id} given a turn");
        let mut ctx = TurnContext::new(rng.as_mut(), sink.as_mut(), config);
        ctx.round = *round;
        ctx.turn = *turn;

        let name = arena[id].name().to_string();
        let hp = arena[id].hp;
        debug!(creature = %name, hp, round = *round, "turn started");
        ctx.narrate(Severity::Action, || format!("{name}'s turn ({hp} HP)."));

        arena.lift(id);
        passive::run_initial(arena, &mut ctx, id);
        conditions::begin_turn(arena, &mut ctx, id);
        resolver::digest(arena, &mut ctx, id);

        if !arena[id].is_dead() && !arena[id].is_incapacitated() {
            passive::run_on_start(arena, &mut ctx, id);
            let behavior = behaviors.resolve(arena[id].template().behavior.as_deref());
            for _ in 0..arena[id].template().attacks_per_round {
                if arena[id].is_dead()
                    || arena[id].is_incapacitated()
                    || !arena.both_sides_alive()
                {
                    break;
                }
                behavior.act(arena, &mut ctx, id);
            }
            if !arena[id].is_dead() {
                passive::run_at_end(arena, &mut ctx, id);
            }
        } else if !arena[id].is_dead() {
            ctx.narrate(Severity::Action, || format!("{name} is incapacitated."));
        }

        if !arena[id].is_dead() {
            conditions::end_turn(arena, &mut ctx, id);
            arena[id].counters.turns_survived += 1;
        }
        arena[id].clear_damage_taken();
        arena.settle(id);
    }
}

/// Fight `a` against `b` to the end.
///
/// # Errors
///
/// Returns [`SkirmishError::EmptyParty`] if either party has no members.
pub fn run_encounter(
    a: Party,
    b: Party,
    config: EncounterConfig,
    rng: Box<dyn RandomSource>,
) -> Result<EncounterReport> {
    Ok(Encounter::new(a, b, config, rng)?.finish())
}
