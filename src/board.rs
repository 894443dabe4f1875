//! Per-player board: fleet layout, incoming fire, and the player's own shots.

use rand::Rng;

use crate::common::{FireError, FireOutcome, PlacementError};
use crate::config::{allowed_count, BOARD_SIZE, FLEET, NUM_SHIPS, RANDOM_PLACEMENT_ATTEMPTS};
use crate::coord::{Coordinate, Grid};
use crate::protocol::{BoardsView, SymbolGrid};
use crate::ship::{Orientation, Ship};

pub const EMPTY_SYMBOL: char = '~';
pub const HIT_SYMBOL: char = '*';
pub const MISS_SYMBOL: char = 'o';

/// One player's board.
///
/// The ship side (`ships`, `incoming_*`) records what the opponent has done to
/// this player; the target side (`shots_fired`, `shot_hits`) records what this
/// player has done to the opponent.
#[derive(Clone, Default)]
pub struct Board {
    ships: Vec<Ship>,
    ship_map: Grid,
    incoming_hits: Grid,
    incoming_misses: Grid,
    shots_fired: Grid,
    shot_hits: Grid,
}

impl Board {
    /// Create an empty board (no ships placed, no shots).
    pub fn new() -> Self {
        Self::default()
    }

    /// Placed ships in placement order.
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Occupancy mask of all ships.
    pub fn ship_map(&self) -> &Grid {
        &self.ship_map
    }

    pub fn incoming_hits(&self) -> &Grid {
        &self.incoming_hits
    }

    pub fn shots_fired(&self) -> &Grid {
        &self.shots_fired
    }

    pub fn shots_fired_count(&self) -> usize {
        self.shots_fired.len()
    }

    /// Ship occupying `cell`, if any.
    pub fn ship_at(&self, cell: Coordinate) -> Option<&Ship> {
        self.ships.iter().find(|s| s.occupies(cell))
    }

    /// Sizes still missing from the fleet, largest first.
    pub fn remaining_sizes(&self) -> Vec<usize> {
        let mut remaining = Vec::with_capacity(NUM_SHIPS);
        let mut placed: Vec<usize> = self.ships.iter().map(Ship::size).collect();
        for size in FLEET {
            if let Some(pos) = placed.iter().position(|&s| s == size) {
                placed.swap_remove(pos);
            } else {
                remaining.push(size);
            }
        }
        remaining
    }

    /// Validate and record a ship of `size` anchored at `anchor`.
    pub fn place_ship(
        &mut self,
        size: usize,
        orientation: Orientation,
        anchor: Coordinate,
    ) -> Result<&Ship, PlacementError> {
        if self.fleet_complete() {
            return Err(PlacementError::FleetComplete);
        }
        let ship = Ship::new(size, orientation, anchor)?;
        if let Some(clash) = ship.cells().iter().find(|&&c| self.ship_map.contains(c)) {
            return Err(PlacementError::Overlaps(*clash));
        }
        if self.ships.iter().filter(|s| s.size() == size).count() >= allowed_count(size) {
            return Err(PlacementError::SizeExhausted(size));
        }
        self.ship_map = self.ship_map.union(ship.mask());
        self.ships.push(ship);
        Ok(&self.ships[self.ships.len() - 1])
    }

    /// Random non-overlapping `(anchor, orientation)` for a ship of `size`.
    pub fn random_placement<R: Rng>(
        &self,
        rng: &mut R,
        size: usize,
    ) -> Result<(Coordinate, Orientation), PlacementError> {
        for _ in 0..RANDOM_PLACEMENT_ATTEMPTS {
            let orient = if rng.random() {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let (max_r, max_c) = match orient {
                Orientation::Horizontal => (BOARD_SIZE - 1, BOARD_SIZE - size),
                Orientation::Vertical => (BOARD_SIZE - size, BOARD_SIZE - 1),
            };
            let anchor = Coordinate::new(rng.random_range(0..=max_r), rng.random_range(0..=max_c))
                .ok_or(PlacementError::OutOfBounds)?;
            let ship = Ship::new(size, orient, anchor)?;
            if !self.ship_map.intersects(ship.mask()) {
                return Ok((anchor, orient));
            }
        }
        Err(PlacementError::UnableToPlaceShip(size))
    }

    /// Place every ship still missing at random. All or nothing.
    pub fn place_remaining_randomly<R: Rng>(&mut self, rng: &mut R) -> Result<usize, PlacementError> {
        let remaining = self.remaining_sizes();
        if remaining.is_empty() {
            return Err(PlacementError::FleetComplete);
        }
        let mut scratch = self.clone();
        for &size in &remaining {
            let (anchor, orient) = scratch.random_placement(rng, size)?;
            scratch.place_ship(size, orient, anchor)?;
        }
        *self = scratch;
        Ok(remaining.len())
    }

    /// Exactly the required fleet is on the board.
    pub fn fleet_complete(&self) -> bool {
        if self.ships.len() != NUM_SHIPS {
            return false;
        }
        let mut sizes: Vec<usize> = self.ships.iter().map(Ship::size).collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes == FLEET
    }

    /// Every ship is fully hit. False for an empty board.
    pub fn all_ships_sunk(&self) -> bool {
        !self.ships.is_empty() && self.ships.iter().all(|s| s.is_sunk(&self.incoming_hits))
    }

    /// This player's view: own ships with incoming fire, and own shots.
    pub fn view(&self) -> BoardsView {
        let mut ship_positions: SymbolGrid = [[EMPTY_SYMBOL; BOARD_SIZE]; BOARD_SIZE];
        for ship in &self.ships {
            for (cell, segment) in ship.segments() {
                ship_positions[cell.row()][cell.col()] = segment.symbol(ship.orientation());
            }
        }
        for cell in self.incoming_hits.iter() {
            ship_positions[cell.row()][cell.col()] = HIT_SYMBOL;
        }
        for cell in self.incoming_misses.iter() {
            ship_positions[cell.row()][cell.col()] = MISS_SYMBOL;
        }

        let mut target_positions: SymbolGrid = [[EMPTY_SYMBOL; BOARD_SIZE]; BOARD_SIZE];
        for cell in self.shots_fired.iter() {
            target_positions[cell.row()][cell.col()] = if self.shot_hits.contains(cell) {
                HIT_SYMBOL
            } else {
                MISS_SYMBOL
            };
        }
        BoardsView {
            ship_positions,
            target_positions,
        }
    }
}

/// `firer` shoots at `target` on `victim`'s board.
///
/// Both boards update in the same call: the firer's target record and the
/// victim's incoming fire. A ship is reported sunk only by the shot that
/// completes it. On error neither board changes.
pub fn fire(
    firer: &mut Board,
    victim: &mut Board,
    target: Coordinate,
) -> Result<FireOutcome, FireError> {
    if firer.shots_fired.contains(target) {
        return Err(FireError::AlreadyTargeted(target));
    }
    firer.shots_fired.insert(target);

    if !victim.ship_map.contains(target) {
        victim.incoming_misses.insert(target);
        return Ok(FireOutcome::Miss);
    }

    firer.shot_hits.insert(target);
    victim.incoming_hits.insert(target);
    let sunk = victim
        .ship_at(target)
        .map(|ship| ship.is_sunk(&victim.incoming_hits))
        .unwrap_or(false);
    if sunk {
        Ok(FireOutcome::HitAndSunk)
    } else {
        Ok(FireOutcome::Hit)
    }
}

impl core::fmt::Debug for Board {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Board")
            .field("ships", &self.ships)
            .field("incoming_hits", &self.incoming_hits)
            .field("incoming_misses", &self.incoming_misses)
            .field("shots_fired", &self.shots_fired)
            .finish()
    }
}
