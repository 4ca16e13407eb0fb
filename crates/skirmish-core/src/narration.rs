//! Narration sinks.
//!
//! The engine describes what happens in plain sentences and hands them to a
//! [`NarrationSink`] together with a [`Severity`] and layout hints. The engine
//! never formats for a particular display; that is the sink's job.
//!
//! Text is built lazily: callers pass a closure and the string is only
//! formatted if the sink [`accepts`](NarrationSink::accepts) the severity, so
//! a batch of thousands of silent matches pays nothing for narration.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// How much detail a line carries. Higher levels are chattier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Encounter start, winner, deaths.
    Summary = 1,
    /// Attacks, saves, conditions.
    Action = 2,
    /// Movement.
    Movement = 3,
    /// Grid snapshots.
    Grid = 4,
}

impl Severity {
    /// Map a numeric verbosity level to the most detailed severity shown.
    ///
    /// Returns `None` for level 0 (silent).
    #[must_use]
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => None,
            1 => Some(Self::Summary),
            2 => Some(Self::Action),
            3 => Some(Self::Movement),
            _ => Some(Self::Grid),
        }
    }
}

/// One narrated line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    /// Detail level
    pub severity: Severity,
    /// Round number, starting at 1
    pub round: u32,
    /// Turn number within the encounter, starting at 1; 0 outside turns
    pub turn: u32,
    /// Whether the line continues the previous one (e.g. damage after a hit)
    pub indent: bool,
    /// The sentence itself
    pub text: String,
}

/// Receiver of narration.
pub trait NarrationSink {
    /// Whether lines of this severity are wanted at all.
    fn accepts(&self, severity: Severity) -> bool {
        let _ = severity;
        true
    }

    /// Receive one line.
    fn narrate(&mut self, line: Narration);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NarrationSink for NullSink {
    fn accepts(&self, _severity: Severity) -> bool {
        false
    }

    fn narrate(&mut self, _line: Narration) {}
}

/// Forwards narration to `tracing` under the `skirmish::narration` target.
///
/// Summary lines are logged at INFO, action lines at DEBUG, movement and
/// grid lines at TRACE.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NarrationSink for TracingSink {
    fn accepts(&self, severity: Severity) -> bool {
        match severity {
            Severity::Summary => {
                tracing::enabled!(target: "skirmish::narration", tracing::Level::INFO)
            }
            Severity::Action => {
                tracing::enabled!(target: "skirmish::narration", tracing::Level::DEBUG)
            }
            Severity::Movement | Severity::Grid => {
                tracing::enabled!(target: "skirmish::narration", tracing::Level::TRACE)
            }
        }
    }

    fn narrate(&mut self, line: Narration) {
        let Narration {
            severity,
            round,
            turn,
            text,
            ..
        } = line;
        match severity {
            Severity::Summary => {
                tracing::info!(target: "skirmish::narration", round, turn, "{text}");
            }
            Severity::Action => {
                tracing::debug!(target: "skirmish::narration", round, turn, "{text}");
            }
            Severity::Movement | Severity::Grid => {
                tracing::trace!(target: "skirmish::narration", round, turn, "{text}");
            }
        }
    }
}

/// Keeps every line up to a severity in a shared buffer.
///
/// Clones share the same buffer, so a test can hand one clone to an
/// encounter and read the lines back from another.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    max: Severity,
    lines: Arc<Mutex<Vec<Narration>>>,
}

impl RecordingSink {
    /// Record lines up to and including `max`.
    #[must_use]
    pub fn new(max: Severity) -> Self {
        Self {
            max,
            lines: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Copy of every line recorded so far.
    #[must_use]
    pub fn lines(&self) -> Vec<Narration> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The recorded text, one line per entry.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.lines()
            .into_iter()
            .map(|l| l.text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new(Severity::Grid)
    }
}

impl NarrationSink for RecordingSink {
    fn accepts(&self, severity: Severity) -> bool {
        severity <= self.max
    }

    fn narrate(&mut self, line: Narration) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(severity: Severity, text: &str) -> Narration {
        Narration {
            severity,
            round: 1,
            turn: 1,
            indent: false,
            text: text.to_string(),
        }
    }

    #[test]
    fn levels_map_to_severities() {
        assert_eq!(Severity::from_level(0), None);
        assert_eq!(Severity::from_level(2), Some(Severity::Action));
        assert_eq!(Severity::from_level(9), Some(Severity::Grid));
        assert!(Severity::Summary < Severity::Movement);
    }

    #[test]
    fn recording_sink_shares_buffer_between_clones() {
        let sink = RecordingSink::new(Severity::Action);
        let mut writer = sink.clone();
        writer.narrate(line(Severity::Summary, "Wolf joins Team A"));
        writer.narrate(line(Severity::Action, "Wolf bites"));
        assert_eq!(sink.lines().len(), 2);
        assert_eq!(sink.transcript(), "Wolf joins Team A\nWolf bites");
    }

    #[test]
    fn recording_sink_filters_by_severity() {
        let sink = RecordingSink::new(Severity::Action);
        assert!(sink.accepts(Severity::Summary));
        assert!(!sink.accepts(Severity::Movement));
    }

    #[test]
    fn null_sink_accepts_nothing() {
        assert!(!NullSink.accepts(Severity::Summary));
    }

    #[test]
    fn tracing_sink_is_quiet_without_a_subscriber() {
        let mut sink = TracingSink;
        assert!(!sink.accepts(Severity::Summary));
        assert!(!sink.accepts(Severity::Grid));
        sink.narrate(line(Severity::Summary, "Wolf bites"));
    }
}
