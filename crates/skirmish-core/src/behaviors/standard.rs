//! The standard strategy most creatures use.

use crate::arena::Arena;
use crate::behavior::{default_target, forced_target, valid_focus, Behavior};
use crate::creature::CombatantId;
use crate::encounter::EncounterConfig;

/// Stays on its focus until the focus dies, then picks the closest enemy if
/// it is dim-witted or the weakest one otherwise.
///
/// # Example
///
/// ```
/// use skirmish_core::behavior::Behavior;
/// use skirmish_core::behaviors::Standard;
///
/// assert_eq!(Standard.id(), "standard");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Standard;

impl Behavior for Standard {
    fn id(&self) -> &'static str {
        "standard"
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
        valid_focus(arena, id).or_else(|| default_target(arena, config, id))
    }
}
