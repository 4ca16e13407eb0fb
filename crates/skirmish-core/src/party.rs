//! Parties: ordered rosters fighting on one side.

use lattice::{distance_ft, GridPos};

use crate::creature::{CombatantId, Creature, Side};
use crate::dice::RandomSource;
use crate::error::{Result, SkirmishError};

/// An ordered roster of creatures sharing a team name.
///
/// Members are never removed; the dead stay addressable so their counters
/// can be read after the encounter.
#[derive(Debug, Clone)]
pub struct Party {
    name: String,
    side: Side,
    members: Vec<Creature>,
}

impl Party {
    /// Create an empty party.
    #[must_use]
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self {
            name: name.into(),
            side,
            members: Vec::new(),
        }
    }

    /// Build a party from `creatures`, rolling everyone's initiative in
    /// roster order.
    ///
    /// # Errors
    ///
    /// Returns [`SkirmishError::EmptyParty`] if `creatures` is empty.
    pub fn muster(
        name: impl Into<String>,
        side: Side,
        creatures: impl IntoIterator<Item = Creature>,
        rng: &mut dyn RandomSource,
    ) -> Result<Self> {
        let mut party = Self::new(name, side);
        for creature in creatures {
            party.add(creature, rng);
        }
        if party.is_empty() {
            return Err(SkirmishError::EmptyParty(party.name));
        }
        Ok(party)
    }

    /// Team name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The side this party fights on.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Add a member: roll its initiative and make its name unique.
    ///
    /// The second wolf becomes "Wolf 2", the third "Wolf 3", and so on.
    ///
    /// # Panics
    ///
    /// Panics if the party already holds `u16::MAX` members.
    pub fn add(&mut self, mut creature: Creature, rng: &mut dyn RandomSource) -> CombatantId {
        assert!(self.members.len() < usize::from(u16::MAX), "party too large");
        let id = self.id(self.members.len());
        creature.roll_initiative(rng);
        let kin = self
            .members
            .iter()
            .filter(|m| m.template().name == creature.template().name)
            .count();
        if kin > 0 {
            let name = format!("{} {}", creature.template().name, kin + 1);
            creature.set_name(name);
        }
        self.members.push(creature);
        id
    }

    /// Members in the order they were added.
    #[must_use]
    pub fn members(&self) -> &[Creature] {
        &self.members
    }

    pub(crate) fn members_mut(&mut self) -> &mut [Creature] {
        &mut self.members
    }

    /// Number of members, living or dead.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True for a party with no members at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Ids of every member.
    pub fn ids(&self) -> impl Iterator<Item = CombatantId> + '_ {
        (0..self.members.len()).map(|slot| self.id(slot))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn id(&self, slot: usize) -> CombatantId {
        CombatantId::new(self.side, slot as u16)
    }

    /// Alive while at least one member is not dead.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.members.iter().any(|m| !m.is_dead())
    }

    /// Members that can be targeted: alive and not swallowed.
    pub fn targetable(&self) -> impl Iterator<Item = (CombatantId, &Creature)> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_targetable())
            .map(|(slot, m)| (self.id(slot), m))
    }

    /// The targetable member with the fewest HP; the earliest slot on ties.
    #[must_use]
    pub fn weakest_alive(&self) -> Option<CombatantId> {
        self.targetable()
            .min_by_key(|(id, m)| (m.hp, *id))
            .map(|(id, _)| id)
    }

    /// The targetable member closest to `from`; the earliest slot on ties.
    #[must_use]
    pub fn closest_alive(&self, from: GridPos) -> Option<CombatantId> {
        self.targetable()
            .min_by_key(|(id, m)| (distance_ft(from, m.position), *id))
            .map(|(id, _)| id)
    }

    /// Line the party up around `anchor`: the first member on the anchor,
    /// the rest alternating to either side along x.
    pub fn deploy(&mut self, anchor: GridPos) {
        for (i, member) in self.members.iter_mut().enumerate() {
            let i = i32::try_from(i).unwrap_or(i32::MAX);
            let dx = if i % 2 == 1 { (i + 1) / 2 } else { -(i / 2) };
            member.position = anchor + GridPos::new(dx, 0, 0);
        }
    }
}
