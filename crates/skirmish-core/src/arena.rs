//! The arena: everything one encounter owns.
//!
//! The Arena holds both parties and the occupancy map. It provides:
//! - Creature lookup by [`CombatantId`] (`arena[id]`)
//! - The round's turn order
//! - Grid bookkeeping: deployment, lifting the acting creature off the map,
//!   burying the dead, swallowing and regurgitating
//! - Team queries used by movement, passives and behaviors
//! - A deterministic state hash
//!
//! # The lifted creature
//!
//! During its own turn a creature is taken off the occupancy map so it never
//! collides with or targets its own stale cell. Its cell is still blocked for
//! everyone else: [`Arena::is_cell_free`] knows which creature is lifted.
//!
//! # Note on `HashMap` Usage
//!
//! The occupancy map is hash-based, but nothing here iterates it in hash
//! order: turn order comes from initiative and ids, neighbour scans follow
//! the fixed offset table, and the state hash walks cells in sorted order.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::ops::{Index, IndexMut};

use lattice::{
    distance_ft, hash_occupancy_into, neighbors, render_layer, GridBounds, GridPos, Marker,
    OccupancyMap,
};
use tracing::warn;

use crate::conditions::{ConditionKind, ConditionState};
use crate::creature::{CombatantId, Creature, Side};
use crate::party::Party;

/// How far from a cell to look for a free one when regurgitating.
const REGURGITATE_SEARCH: usize = 4;

/// Encounter-owned state: two parties and the grid they stand on.
#[derive(Debug, Clone)]
pub struct Arena {
    parties: [Party; 2],
    grid: OccupancyMap<CombatantId>,
    lifted: Option<CombatantId>,
}

impl Arena {
    /// Create an arena for two parties. Nobody is on the grid yet.
    ///
    /// # Panics
    ///
    /// Panics if `a` is not side A or `b` is not side B.
    #[must_use]
    pub fn new(a: Party, b: Party, bounds: GridBounds) -> Self {
        assert_eq!(a.side(), Side::A, "first party must fight on side A");
        assert_eq!(b.side(), Side::B, "second party must fight on side B");
        Self {
            parties: [a, b],
            grid: OccupancyMap::new(bounds),
            lifted: None,
        }
    }

    // -------------------------------------------------------------------------
    // Parties
    // -------------------------------------------------------------------------

    /// The party fighting on `side`.
    #[must_use]
    pub fn party(&self, side: Side) -> &Party {
        &self.parties[side.index()]
    }

    /// Both parties, A first.
    #[must_use]
    pub const fn parties(&self) -> &[Party; 2] {
        &self.parties
    }

    /// Give the parties back, A first.
    #[must_use]
    pub fn into_parties(self) -> [Party; 2] {
        self.parties
    }

    /// The creature behind `id`, if it exists.
    #[must_use]
    pub fn get(&self, id: CombatantId) -> Option<&Creature> {
        self.parties[id.side().index()].members().get(id.slot())
    }

    /// Every combatant id, side A first.
    #[must_use]
    pub fn ids(&self) -> Vec<CombatantId> {
        self.parties.iter().flat_map(Party::ids).collect()
    }

    /// Both parties merged and sorted by descending initiative; equal
    /// initiatives keep id order.
    #[must_use]
    pub fn turn_order(&self) -> Vec<CombatantId> {
        let mut order = self.ids();
        order.sort_by(|a, b| {
            self[*b]
                .initiative()
                .cmp(&self[*a].initiative())
                .then(a.cmp(b))
        });
        order
    }

    /// True while neither party has been wiped out.
    #[must_use]
    pub fn both_sides_alive(&self) -> bool {
        self.parties.iter().all(Party::is_alive)
    }

    /// Living, targetable members of `id`'s opposing party.
    pub fn living_enemies(&self, id: CombatantId) -> impl Iterator<Item = CombatantId> + '_ {
        self.party(id.side().opponent()).targetable().map(|(e, _)| e)
    }

    /// Whether another living, unswallowed member of `id`'s party shares its
    /// template.
    #[must_use]
    pub fn has_living_kin(&self, id: CombatantId) -> bool {
        let kind = &self[id].template().name;
        self.party(id.side())
            .targetable()
            .any(|(other, c)| other != id && &c.template().name == kind)
    }

    /// Distance in feet between two combatants.
    #[must_use]
    pub fn distance(&self, a: CombatantId, b: CombatantId) -> i32 {
        distance_ft(self[a].position, self[b].position)
    }

    // -------------------------------------------------------------------------
    // Grid
    // -------------------------------------------------------------------------

    /// The occupancy map.
    #[must_use]
    pub const fn grid(&self) -> &OccupancyMap<CombatantId> {
        &self.grid
    }

    /// Mutable occupancy map.
    pub fn grid_mut(&mut self) -> &mut OccupancyMap<CombatantId> {
        &mut self.grid
    }

    /// Line both parties up `offset` cells either side of the origin and
    /// put everyone on the grid.
    pub fn deploy(&mut self, offset: i32) {
        self.parties[Side::A.index()].deploy(GridPos::new(0, offset, 0));
        self.parties[Side::B.index()].deploy(GridPos::new(0, -offset, 0));
        for id in self.ids() {
            self.place(id);
        }
    }

    /// Put `id` on the grid at its recorded position.
    ///
    /// # Panics
    ///
    /// Panics if the cell is taken or out of bounds; double occupancy is a
    /// scheduler bug.
    pub fn place(&mut self, id: CombatantId) {
        let pos = self[id].position;
        if let Err(err) = self.grid.place(id, pos) {
            panic!("cannot place {id}: {err}");
        }
    }

    /// Take the acting creature off the grid for its turn.
    pub fn lift(&mut self, id: CombatantId) {
        self.grid.remove(id);
        self.lifted = Some(id);
    }

    /// End of turn: put the acting creature back, unless it died or was
    /// swallowed.
    pub fn settle(&mut self, id: CombatantId) {
        if self.lifted == Some(id) {
            self.lifted = None;
        }
        if self[id].is_targetable() {
            self.place(id);
        }
    }

    /// The creature currently lifted off the grid, if any.
    #[must_use]
    pub const fn lifted(&self) -> Option<CombatantId> {
        self.lifted
    }

    /// Whether `mover` may enter `pos`: in bounds, unoccupied, and not the
    /// cell of the lifted creature (unless `mover` is that creature).
    #[must_use]
    pub fn is_cell_free(&self, pos: GridPos, mover: CombatantId) -> bool {
        if !self.grid.is_free(pos) {
            return false;
        }
        match self.lifted {
            Some(l) if l != mover => !(self[l].is_targetable() && self[l].position == pos),
            _ => true,
        }
    }

    /// The combatant standing on `pos`, counting the lifted creature.
    #[must_use]
    pub fn occupant(&self, pos: GridPos) -> Option<CombatantId> {
        self.grid.occupant(pos).or_else(|| {
            self.lifted
                .filter(|l| self[*l].position == pos && self[*l].is_targetable())
        })
    }

    /// Number of living enemies of `side` around `pos`.
    #[must_use]
    pub fn enemies_around(&self, pos: GridPos, side: Side) -> usize {
        neighbors(pos)
            .filter_map(|n| self.occupant(n))
            .filter(|o| o.side() != side && self[*o].is_targetable())
            .count()
    }

    /// Whether any living enemy stands next to `id`.
    #[must_use]
    pub fn enemy_adjacent(&self, id: CombatantId) -> bool {
        self.enemies_around(self[id].position, id.side()) > 0
    }

    /// Remove a dead creature from the grid, leaving a corpse marker on its
    /// cell, and regurgitate anything it had swallowed. A regurgitated
    /// creature that is lifted for its turn only gets a position; it is
    /// placed when it settles.
    ///
    /// Returns the regurgitated creatures.
    pub fn bury(&mut self, id: CombatantId) -> Vec<CombatantId> {
        self.grid.remove(id);
        let pos = self[id].position;

        let container = self[id]
            .conditions()
            .get(ConditionKind::Swallowed)
            .and_then(|s| s.source);
        if let Some(container) = container {
            self[container].release(id);
        } else {
            self.grid.set_marker(pos, Marker::Corpse);
        }

        let mut freed = Vec::new();
        for victim in self[id].take_stomach() {
            if self[victim].is_dead() {
                continue;
            }
            self[victim].clear_condition(ConditionKind::Swallowed);
            let Some(cell) = self.nearest_free_cell(pos, victim) else {
                warn!(creature = %self[victim].name(), "no free cell to regurgitate onto");
                continue;
            };
            self[victim].position = cell;
            // The acting creature goes back on the grid when it settles.
            if self.lifted != Some(victim) {
                self.place(victim);
            }
            self[victim].apply_condition(ConditionKind::Prone, ConditionState::default());
            freed.push(victim);
        }
        freed
    }

    /// Breadth-first search for the free cell nearest `origin`, `origin`
    /// itself first.
    fn nearest_free_cell(&self, origin: GridPos, mover: CombatantId) -> Option<GridPos> {
        let mut seen = vec![origin];
        let mut frontier = VecDeque::from([(origin, 0)]);
        while let Some((cell, depth)) = frontier.pop_front() {
            if self.is_cell_free(cell, mover) {
                return Some(cell);
            }
            if depth == REGURGITATE_SEARCH {
                continue;
            }
            for next in neighbors(cell) {
                if self.grid.bounds().contains(next) && !seen.contains(&next) {
                    seen.push(next);
                    frontier.push_back((next, depth + 1));
                }
            }
        }
        None
    }

    /// `container` swallows `victim`: the victim leaves the grid and rides
    /// along in the container's stomach. Returns false if the victim is
    /// immune to being swallowed.
    pub fn swallow(&mut self, container: CombatantId, victim: CombatantId) -> bool {
        let state = ConditionState {
            source: Some(container),
            ..ConditionState::default()
        };
        if !self[victim].apply_condition(ConditionKind::Swallowed, state) {
            return false;
        }
        self.grid.remove(victim);
        self[victim].position = self[container].position;
        self[victim].focus = Some(container);
        self[container].swallow(victim);
        true
    }

    // -------------------------------------------------------------------------
    // Determinism
    // -------------------------------------------------------------------------

    /// Hash of every creature's HP, position, conditions and counters plus
    /// the occupancy map. Identical seeds produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for id in self.ids() {
            let c = &self[id];
            id.hash(&mut hasher);
            c.hp.hash(&mut hasher);
            c.max_hp.hash(&mut hasher);
            c.position.to_array().hash(&mut hasher);
            c.conditions().hash(&mut hasher);
            c.counters.hash(&mut hasher);
        }
        hash_occupancy_into(&self.grid, &mut hasher);
        hasher.finish()
    }

    /// ASCII snapshot of the ground layer: side A as `A`, side B as `B`.
    #[must_use]
    pub fn render_ground(&self) -> String {
        render_layer(&self.grid, 0, |id| match id.side() {
            Side::A => 'A',
            Side::B => 'B',
        })
    }
}

impl Index<CombatantId> for Arena {
    type Output = Creature;

    fn index(&self, id: CombatantId) -> &Creature {
        &self.parties[id.side().index()].members()[id.slot()]
    }
}

impl IndexMut<CombatantId> for Arena {
    fn index_mut(&mut self, id: CombatantId) -> &mut Creature {
        &mut self.parties[id.side().index()].members_mut()[id.slot()]
    }
}
