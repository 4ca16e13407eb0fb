//! Skirmish command-line runner.
//!
//! # Usage
//!
//! ```bash
//! # List the built-in bestiary
//! skirmish list
//!
//! # One narrated match
//! skirmish run -a wolf,wolf,wolf -b owlbear --seed 7 --verbose 2
//!
//! # A thousand matches on eight threads
//! skirmish batch -a troll -b wight,ghoul,ghoul --matches 1000 --threads 8
//!
//! # Custom rules and creatures
//! skirmish --config rules.json --bestiary monsters.json run -a imp -b imp
//! ```
//!
//! Narration goes to stdout; logs go to stderr and follow `RUST_LOG`
//! (default `warn`, `-v` for `debug`). With `--verbose 0` the narration is
//! routed into the logs instead.

mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish_core::batch::{run_batch, BatchConfig};
use skirmish_core::narration::{Narration, TracingSink};
use skirmish_core::{Bestiary, Encounter, EncounterConfig, NarrationSink, Severity};

#[derive(Parser)]
#[command(name = "skirmish")]
#[command(about = "Turn-based tactical combat between two parties of creatures")]
#[command(version)]
struct Cli {
    /// Debug logging to stderr
    #[arg(short = 'v', long = "debug", global = true)]
    debug: bool,

    /// Encounter rules as JSON; missing fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stat blocks as a JSON array, replacing the built-in bestiary
    #[arg(long, global = true)]
    bestiary: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every creature in the bestiary
    List,

    /// Run one narrated match
    Run {
        /// Creatures of side A, comma separated
        #[arg(short = 'a', long, value_delimiter = ',', required = true)]
        team_a: Vec<String>,

        /// Creatures of side B, comma separated
        #[arg(short = 'b', long, value_delimiter = ',', required = true)]
        team_b: Vec<String>,

        /// Party name of side A
        #[arg(long, default_value = "Team A")]
        name_a: String,

        /// Party name of side B
        #[arg(long, default_value = "Team B")]
        name_b: String,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Narration detail: 0 logs only, 1 summary, 2 actions, 3 movement, 4 grids
        #[arg(long, default_value = "2", value_parser = clap::value_parser!(u8).range(0..=4))]
        verbose: u8,
    },

    /// Run many matches in parallel and print statistics
    Batch {
        /// Creatures of side A, comma separated
        #[arg(short = 'a', long, value_delimiter = ',', required = true)]
        team_a: Vec<String>,

        /// Creatures of side B, comma separated
        #[arg(short = 'b', long, value_delimiter = ',', required = true)]
        team_b: Vec<String>,

        /// Party name of side A
        #[arg(long, default_value = "Team A")]
        name_a: String,

        /// Party name of side B
        #[arg(long, default_value = "Team B")]
        name_b: String,

        /// Number of matches
        #[arg(short, long, default_value = "100")]
        matches: u32,

        /// Seed of the first match; match i uses seed + i
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Worker threads (0 = one per core)
        #[arg(short, long, default_value = "0")]
        threads: usize,

        /// Print the summary as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
}

/// Prints narration with "Turn N:" prefixes, indenting follow-up lines.
struct ConsoleSink {
    max: Severity,
}

impl NarrationSink for ConsoleSink {
    fn accepts(&self, severity: Severity) -> bool {
        severity <= self.max
    }

    fn narrate(&mut self, line: Narration) {
        if line.indent {
            println!("    {}", line.text);
        } else if line.turn == 0 {
            println!("\n{}", line.text);
        } else {
            println!("Turn {}: {}", line.turn, line.text);
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_bestiary(path: Option<&PathBuf>) -> Result<Bestiary> {
    match path {
        Some(path) => Bestiary::from_file(path)
            .with_context(|| format!("loading bestiary from {}", path.display())),
        None => Ok(Bestiary::builtin()),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EncounterConfig> {
    match path {
        Some(path) => EncounterConfig::from_file(path)
            .with_context(|| format!("loading encounter config from {}", path.display())),
        None => Ok(EncounterConfig::default()),
    }
}

fn cmd_list(bestiary: &Bestiary) {
    print!("{}", report::bestiary_table(bestiary));
}

fn cmd_run(
    bestiary: &Bestiary,
    config: EncounterConfig,
    teams: [(String, Vec<String>); 2],
    seed: u64,
    verbose: u8,
) -> Result<()> {
    let [(name_a, team_a), (name_b, team_b)] = teams;
    let a = bestiary.spawn_all(&team_a).context("building side A")?;
    let b = bestiary.spawn_all(&team_b).context("building side B")?;

    let mut encounter = Encounter::seeded((&name_a, a), (&name_b, b), config, seed)
        .context("setting up the encounter")?;
    encounter = match Severity::from_level(verbose) {
        Some(max) => encounter.with_sink(Box::new(ConsoleSink { max })),
        None => encounter.with_sink(Box::new(TracingSink)),
    };
    info!(seed, "running encounter");
    let report = encounter.finish();
    println!();
    print!("{}", report::encounter_table(&report));
    Ok(())
}

fn cmd_batch(bestiary: &Bestiary, config: &BatchConfig, json: bool) -> Result<()> {
    let summary = run_batch(bestiary, config).context("running batch")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", report::summary_table(&summary));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let bestiary = load_bestiary(cli.bestiary.as_ref())?;
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::List => cmd_list(&bestiary),
        Commands::Run {
            team_a,
            team_b,
            name_a,
            name_b,
            seed,
            verbose,
        } => cmd_run(
            &bestiary,
            config,
            [(name_a, team_a), (name_b, team_b)],
            seed,
            verbose,
        )?,
        Commands::Batch {
            team_a,
            team_b,
            name_a,
            name_b,
            matches,
            seed,
            threads,
            json,
        } => {
            let batch = BatchConfig::new(team_a, team_b, matches)
                .with_seed(seed)
                .with_names(name_a, name_b)
                .with_threads(threads)
                .with_config(config);
            cmd_batch(&bestiary, &batch, json)?;
        }
    }
    Ok(())
}
