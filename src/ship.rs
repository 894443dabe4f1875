//! Ship definitions, placement notation and segment markers.

use core::fmt;
use core::str::FromStr;

use crate::common::{ParseError, PlacementError};
use crate::config::{MAX_SHIP_SIZE, MIN_SHIP_SIZE};
use crate::coord::{Coordinate, Grid};

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn letter(&self) -> char {
        match self {
            Orientation::Horizontal => 'H',
            Orientation::Vertical => 'V',
        }
    }
}

impl FromStr for Orientation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "h" | "H" => Ok(Orientation::Horizontal),
            "v" | "V" => Ok(Orientation::Vertical),
            other => Err(ParseError::InvalidOrientation(other.to_string())),
        }
    }
}

/// Position of a cell within its ship. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Bow,
    Mid,
    Stern,
}

impl Segment {
    /// Marker drawn on the owner's grid.
    pub fn symbol(&self, orientation: Orientation) -> char {
        match (orientation, self) {
            (Orientation::Horizontal, Segment::Bow) => '<',
            (Orientation::Horizontal, Segment::Mid) => '=',
            (Orientation::Horizontal, Segment::Stern) => '>',
            (Orientation::Vertical, Segment::Bow) => '^',
            (Orientation::Vertical, Segment::Mid) => '|',
            (Orientation::Vertical, Segment::Stern) => 'v',
        }
    }
}

/// A parsed `"<size> <H|V> <cell>"` placement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub size: usize,
    pub orientation: Orientation,
    pub anchor: Coordinate,
}

impl FromStr for Placement {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let [size, orientation, anchor] = parts.as_slice() else {
            if parts.is_empty() {
                return Err(ParseError::Empty);
            }
            return Err(ParseError::Placement(input.trim().to_string()));
        };
        let size: usize = size
            .parse()
            .map_err(|_| ParseError::InvalidSize(size.to_string()))?;
        if !(MIN_SHIP_SIZE..=MAX_SHIP_SIZE).contains(&size) {
            return Err(ParseError::InvalidSize(size.to_string()));
        }
        Ok(Placement {
            size,
            orientation: orientation.parse()?,
            anchor: anchor.parse()?,
        })
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.size, self.orientation.letter(), self.anchor)
    }
}

/// A placed ship. Immutable once constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct Ship {
    orientation: Orientation,
    cells: Vec<Coordinate>,
    mask: Grid,
}

impl Ship {
    /// Lay out a ship of `size` from `anchor`, extending right (H) or down (V).
    pub fn new(
        size: usize,
        orientation: Orientation,
        anchor: Coordinate,
    ) -> Result<Self, PlacementError> {
        if !(MIN_SHIP_SIZE..=MAX_SHIP_SIZE).contains(&size) {
            return Err(PlacementError::InvalidSize(size));
        }
        let horizontal = orientation == Orientation::Horizontal;
        let cells = (0..size)
            .map(|i| anchor.offset(horizontal, i))
            .collect::<Option<Vec<_>>>()
            .ok_or(PlacementError::OutOfBounds)?;
        let mask = cells.iter().copied().collect();
        Ok(Ship {
            orientation,
            cells,
            mask,
        })
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Bow first.
    pub fn cells(&self) -> &[Coordinate] {
        &self.cells
    }

    pub fn anchor(&self) -> Coordinate {
        self.cells[0]
    }

    /// Occupancy mask of the ship on the board.
    pub fn mask(&self) -> &Grid {
        &self.mask
    }

    pub fn occupies(&self, cell: Coordinate) -> bool {
        self.mask.contains(cell)
    }

    /// Sunk once every cell is in `hits`.
    pub fn is_sunk(&self, hits: &Grid) -> bool {
        hits.contains_all(&self.mask)
    }

    /// Each cell paired with its segment kind.
    pub fn segments(&self) -> impl Iterator<Item = (Coordinate, Segment)> + '_ {
        let last = self.cells.len() - 1;
        self.cells.iter().enumerate().map(move |(i, &cell)| {
            let segment = if i == 0 {
                Segment::Bow
            } else if i == last {
                Segment::Stern
            } else {
                Segment::Mid
            };
            (cell, segment)
        })
    }
}

impl fmt::Debug for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ size: {}, anchor: {}, orientation: {:?} }}",
            self.size(),
            self.anchor(),
            self.orientation,
        )
    }
}
