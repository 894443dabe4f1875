//! Common types for Battleship: fire outcomes and rule errors.

use core::fmt;

use crate::config::{BOARD_SIZE, MAX_SHIP_SIZE, MIN_SHIP_SIZE};
use crate::coord::Coordinate;

/// Result of an accepted shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireOutcome {
    /// Shot landed in open water.
    Miss,
    /// Shot struck a ship that is still afloat.
    Hit,
    /// Shot struck the last intact segment of a ship.
    HitAndSunk,
}

impl fmt::Display for FireOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FireOutcome::Miss => write!(f, "miss"),
            FireOutcome::Hit => write!(f, "hit"),
            FireOutcome::HitAndSunk => write!(f, "hit and sunk"),
        }
    }
}

/// Errors from parsing cell or placement notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    InvalidRow(String),
    InvalidColumn(String),
    InvalidSize(String),
    InvalidOrientation(String),
    /// Placement text does not have the `<size> <H|V> <cell>` shape.
    Placement(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "Empty input"),
            ParseError::InvalidRow(r) => {
                write!(f, "Invalid row '{}' - must be a letter A-J", r)
            }
            ParseError::InvalidColumn(c) => {
                write!(f, "Invalid column '{}' - must be a number 1-{}", c, BOARD_SIZE)
            }
            ParseError::InvalidSize(s) => write!(
                f,
                "Invalid ship size '{}' - must be {}-{}",
                s, MIN_SHIP_SIZE, MAX_SHIP_SIZE
            ),
            ParseError::InvalidOrientation(o) => {
                write!(f, "Invalid orientation '{}' - use H or V", o)
            }
            ParseError::Placement(p) => write!(
                f,
                "Invalid placement '{}' - expected '<size> <H|V> <cell>', e.g. '3 H B4'",
                p
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors returned by ship placement. The board is unchanged on every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Size outside the allowed range.
    InvalidSize(usize),
    /// Ship would extend past the edge of the grid.
    OutOfBounds,
    /// Ship would share a cell with an already placed ship.
    Overlaps(Coordinate),
    /// Fleet already holds every ship of this size.
    SizeExhausted(usize),
    /// All ships are already placed.
    FleetComplete,
    /// Random placement could not find a free spot.
    UnableToPlaceShip(usize),
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::InvalidSize(s) => write!(
                f,
                "Ship size {} is not allowed - must be {}-{}",
                s, MIN_SHIP_SIZE, MAX_SHIP_SIZE
            ),
            PlacementError::OutOfBounds => write!(f, "Ship placement is out of bounds"),
            PlacementError::Overlaps(c) => {
                write!(f, "Ship placement overlaps another ship at {}", c)
            }
            PlacementError::SizeExhausted(s) => {
                write!(f, "No more {}-cell ships left to place", s)
            }
            PlacementError::FleetComplete => write!(f, "All ships are already placed"),
            PlacementError::UnableToPlaceShip(s) => {
                write!(f, "Unable to find room for a {}-cell ship", s)
            }
        }
    }
}

impl std::error::Error for PlacementError {}

/// Errors returned by a shot. Neither board changes on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireError {
    AlreadyTargeted(Coordinate),
}

impl fmt::Display for FireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FireError::AlreadyTargeted(c) => write!(f, "You already fired at {}", c),
        }
    }
}

impl std::error::Error for FireError {}
