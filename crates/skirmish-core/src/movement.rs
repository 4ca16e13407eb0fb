//! Movement rules on top of the lattice.
//!
//! Creatures walk straight-line paths from [`lattice::line`]. Every cell
//! entered costs the straight-line distance walked so far plus penalties:
//!
//! | Cell                         | Extra cost                         |
//! |------------------------------|------------------------------------|
//! | occupied by an ally          | `ally_cell_penalty` (5 ft)         |
//! | occupied by an enemy         | `enemy_cell_penalty` (10 ft)       |
//! | each enemy next to the cell  | `adjacent_enemy_penalty` (5 ft)    |
//!
//! Penalties accumulate along the path. A creature may pass through occupied
//! cells but always stops on the last free one it reached. Walking ends when
//! the next cell would cost more than the movement left, when the cost meets
//! the movement left, or when the goal is satisfied.

use lattice::{distance_ft, line, step_away, GridPos, FEET_PER_CELL};
use tracing::trace;

use crate::arena::Arena;
use crate::creature::CombatantId;
use crate::narration::Severity;
use crate::turn::TurnContext;

/// Result of a voluntary move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Starting cell
    pub from: GridPos,
    /// Final cell
    pub to: GridPos,
    /// Movement points spent
    pub spent: i32,
    /// The goal was met (in reach, or nowhere to go)
    pub reached: bool,
}

impl MoveOutcome {
    const fn stay(at: GridPos, reached: bool) -> Self {
        Self {
            from: at,
            to: at,
            spent: 0,
            reached,
        }
    }
}

/// Result of a forced move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcedMove {
    /// Final cell
    pub to: GridPos,
    /// The push ran into an obstruction before its full distance
    pub collided: bool,
}

/// Extra cost of entering `cell` for a creature of `mover`'s side.
fn cell_penalty(arena: &Arena, ctx: &TurnContext<'_>, mover: CombatantId, cell: GridPos) -> i32 {
    let side = mover.side();
    let occupied = match arena.occupant(cell) {
        Some(o) if o == mover => 0,
        Some(o) if o.side() == side => ctx.config.ally_cell_penalty,
        Some(_) => ctx.config.enemy_cell_penalty,
        None => 0,
    };
    let around = i32::try_from(arena.enemies_around(cell, side)).unwrap_or(i32::MAX);
    occupied + around.saturating_mul(ctx.config.adjacent_enemy_penalty)
}

/// Walk `path` (starting at the mover's cell) until movement runs out or
/// `done` accepts a free cell. Deducts the movement spent.
fn walk(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    mover: CombatantId,
    path: &[GridPos],
    done: impl Fn(GridPos) -> bool,
) -> MoveOutcome {
    let start = arena[mover].position;
    let budget = arena[mover].movement();
    let mut penalties = 0;
    let mut end = (start, 0);
    let mut reached = done(start);

    for &cell in path.iter().skip(1) {
        if reached {
            break;
        }
        penalties += cell_penalty(arena, ctx, mover, cell);
        let cost = distance_ft(start, cell) + penalties;
        if cost > budget {
            break;
        }
        arena.grid_mut().mark_trace(cell);
        if arena.is_cell_free(cell, mover) {
            end = (cell, cost);
            reached = done(cell);
        }
        if cost >= budget {
            break;
        }
    }

    let (to, spent) = end;
    relocate(arena, mover, to);
    arena[mover].set_movement(budget - spent);
    if to != start {
        let name = arena[mover].name().to_string();
        trace!(creature = %name, from = %start, to = %to, spent, "moved");
        ctx.narrate(Severity::Movement, || {
            format!("{name} moves from {start} to {to} ({spent} ft).")
        });
        if ctx.sink.accepts(Severity::Grid) {
            let snapshot = arena.render_ground();
            ctx.narrate(Severity::Grid, || snapshot);
        }
    }
    MoveOutcome {
        from: start,
        to,
        spent,
        reached,
    }
}

/// Update a creature's position, moving its grid entry if it has one.
/// Anything it has swallowed travels with it.
fn relocate(arena: &mut Arena, id: CombatantId, to: GridPos) {
    if arena.grid().position_of(id).is_some() {
        if let Err(err) = arena.grid_mut().relocate(id, to) {
            panic!("cannot move {id}: {err}");
        }
    }
    arena[id].position = to;
    for victim in arena[id].stomach().to_vec() {
        arena[victim].position = to;
    }
}

/// Move `mover` toward `target` until it is within `reach` feet.
///
/// The mover heads for the free cell next to the target that is nearest to
/// itself; creatures that cannot fly stay on their own level. If no such
/// cell exists the mover cannot reach and loses its remaining movement.
pub fn close_distance(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    mover: CombatantId,
    target: CombatantId,
    reach: i32,
) -> MoveOutcome {
    let start = arena[mover].position;
    let goal = arena[target].position;
    if distance_ft(start, goal) <= reach {
        return MoveOutcome::stay(start, true);
    }
    if arena[mover].movement() <= 0 {
        return MoveOutcome::stay(start, false);
    }

    let flies = arena[mover].can_fly();
    let destination = arena.grid().free_adjacent_by(goal, start, |cell| {
        arena.is_cell_free(cell, mover) && (flies || cell.z == start.z)
    });
    let Some(destination) = destination else {
        arena[mover].set_movement(0);
        let name = arena[mover].name().to_string();
        ctx.narrate(Severity::Movement, || format!("{name} cannot reach its target."));
        return MoveOutcome::stay(start, false);
    };

    let path = line(start, destination);
    walk(arena, ctx, mover, &path, |cell| distance_ft(cell, goal) <= reach)
}

/// Back `mover` away from `threat`, staying within `hold_within` feet of it.
///
/// The mover aims at the point its whole remaining movement would carry it
/// directly away from the threat, and walks only the part of that line that
/// keeps the threat in range.
pub fn keep_distance(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    mover: CombatantId,
    threat: CombatantId,
    hold_within: i32,
) -> MoveOutcome {
    let start = arena[mover].position;
    let danger = arena[threat].position;
    let cells = arena[mover].movement() / FEET_PER_CELL;
    if cells <= 0 {
        return MoveOutcome::stay(start, false);
    }

    let mut aim = step_away(start, danger, cells);
    if !arena[mover].can_fly() {
        aim.z = start.z;
    }
    let aim = arena.grid().bounds().clamp(aim);
    let path: Vec<GridPos> = line(start, aim)
        .into_iter()
        .take_while(|cell| distance_ft(*cell, danger) <= hold_within)
        .collect();
    if path.len() < 2 {
        return MoveOutcome::stay(start, true);
    }
    walk(arena, ctx, mover, &path, |_| false)
}

/// Push `target` `distance` feet directly away from `from`.
///
/// The push stops on the last free cell before the first obstruction
/// (another creature or the edge of the grid) and reports the collision.
pub fn forced_move(
    arena: &mut Arena,
    ctx: &mut TurnContext<'_>,
    target: CombatantId,
    from: GridPos,
    distance: i32,
) -> ForcedMove {
    let start = arena[target].position;
    let cells = distance / FEET_PER_CELL;
    let mut aim = step_away(start, from, cells);
    aim.z = start.z;

    let mut to = start;
    let mut collided = false;
    for cell in line(start, aim).into_iter().skip(1) {
        if !arena.is_cell_free(cell, target) {
            collided = true;
            break;
        }
        to = cell;
    }
    relocate(arena, target, to);

    let name = arena[target].name().to_string();
    ctx.narrate_detail(Severity::Action, || {
        if collided {
            format!("{name} is knocked back to {to} and slams into an obstacle.")
        } else {
            format!("{name} is knocked back to {to}.")
        }
    });
    ForcedMove { to, collided }
}
