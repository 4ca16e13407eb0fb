//! Per-turn context handed to every rule that rolls dice or narrates.

use crate::dice::RandomSource;
use crate::encounter::EncounterConfig;
use crate::narration::{Narration, NarrationSink, Severity};

/// Everything a turn needs besides the arena itself.
///
/// The arena is passed separately so rules can borrow it mutably while
/// still rolling dice and narrating through this context.
pub struct TurnContext<'a> {
    /// Dice for every roll this turn
    pub rng: &'a mut dyn RandomSource,
    /// Where narration goes
    pub sink: &'a mut dyn NarrationSink,
    /// Encounter rules
    pub config: &'a EncounterConfig,
    /// Current round, starting at 1
    pub round: u32,
    /// Current turn number within the encounter, starting at 1
    pub turn: u32,
}

impl<'a> TurnContext<'a> {
    /// Bundle the pieces of a turn.
    pub fn new(
        rng: &'a mut dyn RandomSource,
        sink: &'a mut dyn NarrationSink,
        config: &'a EncounterConfig,
    ) -> Self {
        Self {
            rng,
            sink,
            config,
            round: 0,
            turn: 0,
        }
    }

    /// Narrate a line that starts a new beat of the story.
    pub fn narrate(&mut self, severity: Severity, text: impl FnOnce() -> String) {
        self.emit(severity, false, text);
    }

    /// Narrate a line that continues the previous one.
    pub fn narrate_detail(&mut self, severity: Severity, text: impl FnOnce() -> String) {
        self.emit(severity, true, text);
    }

    fn emit(&mut self, severity: Severity, indent: bool, text: impl FnOnce() -> String) {
        if !self.sink.accepts(severity) {
            return;
        }
        self.sink.narrate(Narration {
            severity,
            round: self.round,
            turn: self.turn,
            indent,
            text: text(),
        });
    }
}

impl std::fmt::Debug for TurnContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnContext")
            .field("round", &self.round)
            .field("turn", &self.turn)
            .finish_non_exhaustive()
    }
}
