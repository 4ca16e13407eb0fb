//! Batch runner for balance testing.
//!
//! Runs many seeded matches between the same two rosters in parallel with
//! rayon and folds the results into win rates and per-creature statistics.
//!
//! Match `i` always uses seed `seed_start + i`, and results are folded in
//! seed order, so a batch summary is reproducible regardless of how many
//! threads ran it.
//!
//! # Example
//!
//! ```
//! use skirmish_core::batch::{run_batch, BatchConfig};
//! use skirmish_core::bestiary::Bestiary;
//!
//! let config = BatchConfig::new(vec!["wolf".into(), "wolf".into()], vec!["ogre".into()], 8);
//! let summary = run_batch(&Bestiary::builtin(), &config).unwrap();
//! assert_eq!(summary.matches, 8);
//! assert_eq!(summary.wins.values().sum::<u32>() + summary.draws, 8);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bestiary::Bestiary;
use crate::creature::{CombatCounters, Side};
use crate::encounter::{Encounter, EncounterConfig, Outcome};
use crate::error::{Result, SkirmishError};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of matches to run
    pub matches: u32,
    /// Seed of the first match
    pub seed_start: u64,
    /// Party name of side A
    pub name_a: String,
    /// Party name of side B
    pub name_b: String,
    /// Creature names of side A, in roster order
    pub team_a: Vec<String>,
    /// Creature names of side B, in roster order
    pub team_b: Vec<String>,
    /// Worker threads (0 = rayon default)
    pub threads: usize,
    /// Rules for every match
    pub config: EncounterConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            matches: 100,
            seed_start: 0,
            name_a: "Team A".to_string(),
            name_b: "Team B".to_string(),
            team_a: Vec::new(),
            team_b: Vec::new(),
            threads: 0,
            config: EncounterConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Create a config pitting `team_a` against `team_b`.
    #[must_use]
    pub fn new(team_a: Vec<String>, team_b: Vec<String>, matches: u32) -> Self {
        Self {
            matches,
            team_a,
            team_b,
            ..Default::default()
        }
    }

    /// Set the first seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set both party names.
    #[must_use]
    pub fn with_names(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.name_a = a.into();
        self.name_b = b.into();
        self
    }

    /// Set the encounter rules.
    #[must_use]
    pub fn with_config(mut self, config: EncounterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the worker thread count.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Party name and roster for `side`.
    #[must_use]
    pub fn team(&self, side: Side) -> (&str, &[String]) {
        match side {
            Side::A => (&self.name_a, &self.team_a),
            Side::B => (&self.name_b, &self.team_b),
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// What one match produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Seed the match ran with
    pub seed: u64,
    /// How it ended
    pub outcome: Outcome,
    /// Rounds fought
    pub rounds: u32,
    /// Final arena hash
    pub state_hash: u64,
    /// Template name and counters of every member, side A first
    pub members: [Vec<(String, CombatCounters)>; 2],
}

/// Counters summed over every match and every instance of one template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatureTally {
    /// Template name
    pub name: String,
    /// Instances per match
    pub count: u32,
    /// Turns taken while alive
    pub turns_survived: u64,
    /// Damage dealt after mitigation
    pub damage_dealt: i64,
    /// Enemies killed
    pub kills: u64,
    /// Deaths
    pub deaths: u64,
    /// Deaths caused by its own action
    pub suicides: u64,
    /// Attacks that hit
    pub hits: u64,
    /// Attacks that missed
    pub misses: u64,
}

/// Per-match averages of a [`CreatureTally`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TallyAverages {
    /// Turns taken while alive
    pub turns_survived: f64,
    /// Damage dealt
    pub damage_dealt: f64,
    /// Kills
    pub kills: f64,
    /// Deaths
    pub deaths: f64,
    /// Suicides
    pub suicides: f64,
    /// Hits
    pub hits: f64,
    /// Misses
    pub misses: f64,
}

impl CreatureTally {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn add(&mut self, counters: &CombatCounters) {
        self.turns_survived += u64::from(counters.turns_survived);
        self.damage_dealt += counters.damage_dealt;
        self.kills += u64::from(counters.kills);
        self.deaths += u64::from(counters.deaths);
        self.suicides += u64::from(counters.suicides);
        self.hits += u64::from(counters.hits);
        self.misses += u64::from(counters.misses);
    }

    /// Totals divided by `matches`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn averages(&self, matches: u32) -> TallyAverages {
        let n = f64::from(matches.max(1));
        TallyAverages {
            turns_survived: self.turns_survived as f64 / n,
            damage_dealt: self.damage_dealt as f64 / n,
            kills: self.kills as f64 / n,
            deaths: self.deaths as f64 / n,
            suicides: self.suicides as f64 / n,
            hits: self.hits as f64 / n,
            misses: self.misses as f64 / n,
        }
    }

    /// Hits over attacks made, `None` if it never attacked.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> Option<f64> {
        let attacks = self.hits + self.misses;
        (attacks > 0).then(|| self.hits as f64 / attacks as f64)
    }
}

/// Tallies of one team, one entry per template in roster order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamTally {
    /// Party name
    pub name: String,
    /// Per-template tallies
    pub creatures: Vec<CreatureTally>,
}

impl TeamTally {
    fn new(name: &str, roster: &[String], bestiary: &Bestiary) -> Self {
        let mut creatures: Vec<CreatureTally> = Vec::new();
        for entry in roster {
            let name = bestiary
                .get(entry)
                .map_or(entry.as_str(), |block| block.name.as_str());
            match creatures.iter_mut().find(|t| t.name == name) {
                Some(tally) => tally.count += 1,
                None => {
                    let mut tally = CreatureTally::new(name);
                    tally.count = 1;
                    creatures.push(tally);
                }
            }
        }
        Self {
            name: name.to_string(),
            creatures,
        }
    }

    fn add(&mut self, members: &[(String, CombatCounters)]) {
        for (template, counters) in members {
            if let Some(tally) = self.creatures.iter_mut().find(|t| &t.name == template) {
                tally.add(counters);
            }
        }
    }
}

/// Aggregate results of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches run
    pub matches: u32,
    /// Wins per party name
    pub wins: BTreeMap<String, u32>,
    /// Matches with no winner
    pub draws: u32,
    /// Rounds fought over all matches
    pub total_rounds: u64,
    /// Per-team tallies, side A first
    pub teams: [TeamTally; 2],
}

impl BatchSummary {
    fn new(bestiary: &Bestiary, config: &BatchConfig) -> Self {
        let team = |side| {
            let (name, roster) = config.team(side);
            TeamTally::new(name, roster, bestiary)
        };
        let mut wins = BTreeMap::new();
        for side in Side::BOTH {
            wins.insert(config.team(side).0.to_string(), 0);
        }
        Self {
            matches: 0,
            wins,
            draws: 0,
            total_rounds: 0,
            teams: [team(Side::A), team(Side::B)],
        }
    }

    fn record(&mut self, result: &MatchResult) {
        self.matches += 1;
        self.total_rounds += u64::from(result.rounds);
        match &result.outcome {
            Outcome::Winner { party, .. } => *self.wins.entry(party.clone()).or_insert(0) += 1,
            Outcome::Draw => self.draws += 1,
        }
        for side in Side::BOTH {
            self.teams[side.index()].add(&result.members[side.index()]);
        }
    }

    /// Fraction of matches won by `party`.
    #[must_use]
    pub fn win_rate(&self, party: &str) -> f64 {
        let wins = self.wins.get(party).copied().unwrap_or(0);
        f64::from(wins) / f64::from(self.matches.max(1))
    }

    /// Fraction of matches drawn.
    #[must_use]
    pub fn draw_rate(&self) -> f64 {
        f64::from(self.draws) / f64::from(self.matches.max(1))
    }

    /// Mean match length in rounds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_rounds(&self) -> f64 {
        self.total_rounds as f64 / f64::from(self.matches.max(1))
    }
}

// =============================================================================
// Running
// =============================================================================

fn validate(bestiary: &Bestiary, config: &BatchConfig) -> Result<()> {
    for side in Side::BOTH {
        let (name, roster) = config.team(side);
        if roster.is_empty() {
            return Err(SkirmishError::EmptyParty(name.to_string()));
        }
        bestiary.spawn_all(roster)?;
    }
    Ok(())
}

/// Run one seeded match.
///
/// # Errors
///
/// Returns [`SkirmishError::UnknownCreature`] or
/// [`SkirmishError::EmptyParty`] for a bad roster.
pub fn run_match(bestiary: &Bestiary, config: &BatchConfig, seed: u64) -> Result<MatchResult> {
    let a = bestiary.spawn_all(&config.team_a)?;
    let b = bestiary.spawn_all(&config.team_b)?;
    let report = Encounter::seeded(
        (&config.name_a, a),
        (&config.name_b, b),
        config.config.clone(),
        seed,
    )?
    .finish();

    let members = report.parties.each_ref().map(|party| {
        party
            .members()
            .iter()
            .map(|c| (c.template().name.clone(), c.counters))
            .collect()
    });
    Ok(MatchResult {
        seed,
        outcome: report.outcome,
        rounds: report.rounds,
        state_hash: report.state_hash,
        members,
    })
}

fn run_all(bestiary: &Bestiary, config: &BatchConfig) -> Result<Vec<MatchResult>> {
    let completed = AtomicU32::new(0);
    (0..config.matches)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            let result = run_match(bestiary, config, seed);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % 100 == 0 {
                debug!("progress: {}/{}", done, config.matches);
            }
            result
        })
        .collect()
}

/// Run a batch of matches in parallel and summarise them.
///
/// # Errors
///
/// Returns [`SkirmishError::EmptyParty`] or
/// [`SkirmishError::UnknownCreature`] if a roster is invalid; nothing is
/// run in that case.
pub fn run_batch(bestiary: &Bestiary, config: &BatchConfig) -> Result<BatchSummary> {
    validate(bestiary, config)?;
    info!(
        "starting batch: {} matches, {} vs {}",
        config.matches, config.name_a, config.name_b
    );

    let results = if config.threads > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
        {
            Ok(pool) => pool.install(|| run_all(bestiary, config)),
            Err(e) => {
                warn!("failed to build thread pool: {}, using the global pool", e);
                run_all(bestiary, config)
            }
        }
    } else {
        run_all(bestiary, config)
    }?;

    let mut summary = BatchSummary::new(bestiary, config);
    for result in &results {
        summary.record(result);
    }
    info!(
        "batch complete: {} matches, {} draws",
        summary.matches, summary.draws
    );
    Ok(summary)
}

/// Replay `seed` `runs` times and check every run ends in the same state.
///
/// # Errors
///
/// Returns the roster errors of [`run_match`].
pub fn verify_determinism(
    bestiary: &Bestiary,
    config: &BatchConfig,
    seed: u64,
    runs: u32,
) -> Result<bool> {
    let first = run_match(bestiary, config, seed)?;
    for _ in 1..runs {
        let next = run_match(bestiary, config, seed)?;
        if next != first {
            warn!(
                "seed {} diverged: hash {:#x} vs {:#x}",
                seed, first.state_hash, next.state_hash
            );
            return Ok(false);
        }
    }
    Ok(true)
}
