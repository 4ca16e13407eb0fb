//! Plain-text tables for the terminal.

use std::fmt::Write;

use skirmish_core::batch::BatchSummary;
use skirmish_core::creature::Speeds;
use skirmish_core::{Bestiary, EncounterReport, Party};

/// Challenge rating the way stat blocks print it: fractions below 1.
pub fn format_cr(cr: f32) -> String {
    const FRACTIONS: [(f32, &str); 3] = [(0.125, "1/8"), (0.25, "1/4"), (0.5, "1/2")];
    FRACTIONS
        .iter()
        .find(|(value, _)| (cr - value).abs() < f32::EPSILON)
        .map_or_else(|| format!("{cr}"), |(_, text)| (*text).to_string())
}

/// "40 ft" or "60 ft, fly 90 ft".
pub fn format_speed(speed: Speeds) -> String {
    if speed.can_fly() {
        format!("{} ft, fly {} ft", speed.ground, speed.fly)
    } else {
        format!("{} ft", speed.ground)
    }
}

/// One row per stat block.
pub fn bestiary_table(bestiary: &Bestiary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<14} {:>5} {:>4} {:>5}  Speed", "Name", "CR", "AC", "HP");
    for block in bestiary.blocks() {
        let _ = writeln!(
            out,
            "{:<14} {:>5} {:>4} {:>5}  {}",
            block.name,
            format_cr(block.cr),
            block.ac,
            block.hp,
            format_speed(block.speed)
        );
    }
    out
}

fn party_table(out: &mut String, party: &Party) {
    let _ = writeln!(out, "{}", party.name());
    let _ = writeln!(
        out,
        "  {:<16} {:>9} {:>6} {:>5} {:>5} {:>6} {:>5}",
        "Creature", "HP", "Damage", "Kills", "Hits", "Misses", "Turns"
    );
    for c in party.members() {
        let hp = if c.is_dead() {
            "dead".to_string()
        } else {
            format!("{}/{}", c.hp, c.max_hp)
        };
        let _ = writeln!(
            out,
            "  {:<16} {:>9} {:>6} {:>5} {:>5} {:>6} {:>5}",
            c.name(),
            hp,
            c.counters.damage_dealt,
            c.counters.kills,
            c.counters.hits,
            c.counters.misses,
            c.counters.turns_survived
        );
    }
}

/// Outcome line followed by each party's final state.
pub fn encounter_table(report: &EncounterReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Result: {} after {} rounds", report.outcome, report.rounds);
    let _ = writeln!(out, "State hash: {:#018x}", report.state_hash);
    for party in &report.parties {
        out.push('\n');
        party_table(&mut out, party);
    }
    out
}

/// Win rates, then per-creature averages for each team.
pub fn summary_table(summary: &BatchSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Matches: {}", summary.matches);
    for (party, wins) in &summary.wins {
        let _ = writeln!(
            out,
            "  {:<16} {:>6} wins ({:>5.1}%)",
            party,
            wins,
            summary.win_rate(party) * 100.0
        );
    }
    let _ = writeln!(
        out,
        "  {:<16} {:>6}      ({:>5.1}%)",
        "Draws",
        summary.draws,
        summary.draw_rate() * 100.0
    );
    let _ = writeln!(out, "Average rounds: {:.1}", summary.average_rounds());

    for team in &summary.teams {
        out.push('\n');
        let _ = writeln!(out, "{} (averages per match)", team.name);
        let _ = writeln!(
            out,
            "  {:<18} {:>6} {:>7} {:>6} {:>6} {:>8} {:>6} {:>6} {:>5}",
            "Creature", "Turns", "Damage", "Kills", "Deaths", "Suicides", "Hits", "Misses", "Hit%"
        );
        for tally in &team.creatures {
            let avg = tally.averages(summary.matches);
            let label = if tally.count > 1 {
                format!("{} x{}", tally.name, tally.count)
            } else {
                tally.name.clone()
            };
            let hit_rate = tally
                .hit_rate()
                .map_or_else(|| "-".to_string(), |r| format!("{:.0}", r * 100.0));
            let _ = writeln!(
                out,
                "  {:<18} {:>6.2} {:>7.2} {:>6.2} {:>6.2} {:>8.2} {:>6.2} {:>6.2} {:>5}",
                label,
                avg.turns_survived,
                avg.damage_dealt,
                avg.kills,
                avg.deaths,
                avg.suicides,
                avg.hits,
                avg.misses,
                hit_rate
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::batch::{run_batch, BatchConfig};

    #[test]
    fn fractional_ratings_print_as_fractions() {
        assert_eq!(format_cr(0.125), "1/8");
        assert_eq!(format_cr(0.25), "1/4");
        assert_eq!(format_cr(0.5), "1/2");
        assert_eq!(format_cr(3.0), "3");
    }

    #[test]
    fn fliers_show_both_speeds() {
        assert_eq!(format_speed(Speeds::walking(30)), "30 ft");
        assert_eq!(format_speed(Speeds { ground: 60, fly: 90 }), "60 ft, fly 90 ft");
    }

    #[test]
    fn bestiary_table_lists_every_creature() {
        let bestiary = Bestiary::builtin();
        let table = bestiary_table(&bestiary);
        assert_eq!(table.lines().count(), bestiary.len() + 1);
        assert!(table.contains("Nightmare"));
        assert!(table.contains("fly 90 ft"));
    }

    #[test]
    fn summary_table_names_both_teams() {
        let config = BatchConfig::new(vec!["wolf".into()], vec!["goblin".into()], 4)
            .with_names("Wolves", "Goblins");
        let summary = run_batch(&Bestiary::builtin(), &config).unwrap();
        let table = summary_table(&summary);
        assert!(table.contains("Matches: 4"));
        assert!(table.contains("Wolves (averages per match)"));
        assert!(table.contains("Goblin"));
    }
}
