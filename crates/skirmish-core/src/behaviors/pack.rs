//! Pack animals gang up on one enemy.

use crate::arena::Arena;
use crate::behavior::{default_target, forced_target, is_valid_target, valid_focus, Behavior};
use crate::creature::CombatantId;
use crate::encounter::EncounterConfig;

/// Like [`Standard`](super::Standard), but before choosing a fresh target it
/// takes the focus of the first living ally that has one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pack;

impl Pack {
    fn ally_focus(arena: &Arena, id: CombatantId) -> Option<CombatantId> {
        arena
            .party(id.side())
            .ids()
            .filter(|&ally| ally != id && !arena[ally].is_dead())
            .filter_map(|ally| arena[ally].focus)
            .find(|&target| is_valid_target(arena, id, target))
    }
}

impl Behavior for Pack {
    fn id(&self) -> &'static str {
        "pack"
    }

    fn pick_target(
        &self,
        arena: &Arena,
        config: &EncounterConfig,
        id: CombatantId,
    ) -> Option<CombatantId> {
        if let Some(forced) = forced_target(arena, id) {
            return forced;
        }
        valid_focus(arena, id)
            .or_else(|| Self::ally_focus(arena, id))
            .or_else(|| default_target(arena, config, id))
    }
}
