//! Cell coordinates (`A1`..`J10`) and coordinate sets.

use core::fmt;
use core::str::FromStr;

use crate::bitboard::BitBoard;
use crate::common::ParseError;
use crate::config::BOARD_SIZE;

/// A cell on the 10×10 grid. Row is the letter `A`-`J`, column is `1`-`10`.
///
/// Always in bounds: the only constructors check the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    row: u8,
    col: u8,
}

impl Coordinate {
    /// Zero-based `row` and `col`; `None` when outside the grid.
    pub fn new(row: usize, col: usize) -> Option<Self> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Some(Self {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// Zero-based row index.
    pub fn row(&self) -> usize {
        self.row as usize
    }

    /// Zero-based column index.
    pub fn col(&self) -> usize {
        self.col as usize
    }

    pub fn row_letter(&self) -> char {
        (b'A' + self.row) as char
    }

    /// Cell `steps` away along a row (`horizontal`) or down a column.
    pub fn offset(&self, horizontal: bool, steps: usize) -> Option<Self> {
        if horizontal {
            Self::new(self.row(), self.col() + steps)
        } else {
            Self::new(self.row() + steps, self.col())
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.col + 1)
    }
}

impl FromStr for Coordinate {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let mut chars = input.chars();
        let row_ch = chars.next().ok_or(ParseError::Empty)?.to_ascii_uppercase();
        if !row_ch.is_ascii_uppercase() {
            return Err(ParseError::InvalidRow(row_ch.to_string()));
        }
        let row = (row_ch as u8 - b'A') as usize;
        if row >= BOARD_SIZE {
            return Err(ParseError::InvalidRow(row_ch.to_string()));
        }
        let col_str = chars.as_str();
        // Plain digits only: no sign, no leading zero.
        if !col_str.bytes().all(|b| b.is_ascii_digit()) || col_str.starts_with('0') {
            return Err(ParseError::InvalidColumn(col_str.to_string()));
        }
        let col: usize = col_str
            .parse()
            .map_err(|_| ParseError::InvalidColumn(col_str.to_string()))?;
        if col == 0 || col > BOARD_SIZE {
            return Err(ParseError::InvalidColumn(col_str.to_string()));
        }
        Coordinate::new(row, col - 1).ok_or_else(|| ParseError::InvalidColumn(col_str.to_string()))
    }
}

/// A set of cells packed into a bitboard.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Grid(BitBoard<u128, BOARD_SIZE>);

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, cell: Coordinate) -> bool {
        self.0.get(cell.row(), cell.col()).unwrap_or(false)
    }

    pub fn insert(&mut self, cell: Coordinate) {
        // Coordinates are in bounds by construction.
        let _ = self.0.set(cell.row(), cell.col());
    }

    pub fn len(&self) -> usize {
        self.0.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the two sets share at least one cell.
    pub fn intersects(&self, other: &Grid) -> bool {
        !(self.0 & other.0).is_empty()
    }

    /// True if every cell of `other` is in `self`.
    pub fn contains_all(&self, other: &Grid) -> bool {
        self.0.contains_all(&other.0)
    }

    pub fn union(&self, other: &Grid) -> Grid {
        Grid(self.0 | other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.0
            .iter_set_bits()
            .filter_map(|(r, c)| Coordinate::new(r, c))
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|c| c.to_string())).finish()
    }
}

impl FromIterator<Coordinate> for Grid {
    fn from_iter<I: IntoIterator<Item = Coordinate>>(iter: I) -> Self {
        let mut grid = Grid::new();
        for cell in iter {
            grid.insert(cell);
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitive_cells() {
        let c: Coordinate = "b7".parse().unwrap();
        assert_eq!((c.row(), c.col()), (1, 6));
        assert_eq!(c.to_string(), "B7");
        assert_eq!("J10".parse::<Coordinate>().unwrap().to_string(), "J10");
    }

    #[test]
    fn rejects_out_of_range_cells() {
        assert_eq!("K1".parse::<Coordinate>(), Err(ParseError::InvalidRow("K".into())));
        assert_eq!("A0".parse::<Coordinate>(), Err(ParseError::InvalidColumn("0".into())));
        assert_eq!("A11".parse::<Coordinate>(), Err(ParseError::InvalidColumn("11".into())));
        assert_eq!("".parse::<Coordinate>(), Err(ParseError::Empty));
        assert!("1A".parse::<Coordinate>().is_err());
        assert!("A".parse::<Coordinate>().is_err());
        assert_eq!("A+5".parse::<Coordinate>(), Err(ParseError::InvalidColumn("+5".into())));
        assert_eq!("A05".parse::<Coordinate>(), Err(ParseError::InvalidColumn("05".into())));
        assert_eq!("B 7".parse::<Coordinate>(), Err(ParseError::InvalidColumn(" 7".into())));
    }

    #[test]
    fn grid_set_operations() {
        let a: Grid = ["A1", "A2"].iter().map(|s| s.parse::<Coordinate>().unwrap()).collect();
        let b: Grid = ["A2"].iter().map(|s| s.parse::<Coordinate>().unwrap()).collect();
        assert!(a.intersects(&b));
        assert!(a.contains_all(&b));
        assert!(!b.contains_all(&a));
        assert_eq!(a.union(&b).len(), 2);
    }
}
