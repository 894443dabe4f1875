//! Cell sets packed into one unsigned integer.
//!
//! `BitBoard<T, N>` covers an `N×N` grid, bit `row * N + col`. The game uses
//! `BitBoard<u128, 10>` for ship occupancy, shots and hits, so overlap and
//! sunk checks are single mask operations.

use core::fmt;
use core::ops::{BitAnd, BitOr};

use num_traits::{PrimInt, Unsigned};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitBoardError {
    /// `N*N` cells do not fit in the storage word.
    SizeTooLarge { n: usize, capacity: usize },
    IndexOutOfBounds { row: usize, col: usize },
}

impl fmt::Display for BitBoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitBoardError::SizeTooLarge { n, capacity } => {
                write!(f, "board of {}x{} cells exceeds {} bits", n, n, capacity)
            }
            BitBoardError::IndexOutOfBounds { row, col } => {
                write!(f, "cell ({}, {}) is outside the board", row, col)
            }
        }
    }
}

impl std::error::Error for BitBoardError {}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BitBoard<T: PrimInt + Unsigned, const N: usize> {
    bits: T,
}

impl<T: PrimInt + Unsigned, const N: usize> BitBoard<T, N> {
    const CELLS: usize = N * N;
    const CAPACITY: usize = core::mem::size_of::<T>() * 8;

    /// Empty set. Use [`BitBoard::try_new`] when `N` is not known to fit.
    pub fn new() -> Self {
        Self { bits: T::zero() }
    }

    pub fn try_new() -> Result<Self, BitBoardError> {
        if Self::CELLS > Self::CAPACITY {
            return Err(BitBoardError::SizeTooLarge {
                n: N,
                capacity: Self::CAPACITY,
            });
        }
        Ok(Self::new())
    }

    /// Build from a raw word. Bits past the last cell are dropped.
    pub fn from_raw(raw: T) -> Self {
        let spare = Self::CAPACITY - Self::CELLS.min(Self::CAPACITY);
        // Shift up then down so the unused high bits are cleared.
        Self {
            bits: (raw << spare) >> spare,
        }
    }

    pub fn count_ones(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == T::zero()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<bool, BitBoardError> {
        let bit = Self::bit(row, col)?;
        Ok(self.bits & bit != T::zero())
    }

    pub fn set(&mut self, row: usize, col: usize) -> Result<(), BitBoardError> {
        let bit = Self::bit(row, col)?;
        self.bits = self.bits | bit;
        Ok(())
    }

    /// Every cell of `other` is also in `self`.
    pub fn contains_all(&self, other: &Self) -> bool {
        self.bits & other.bits == other.bits
    }

    /// Set cells as `(row, col)`, row-major.
    pub fn iter_set_bits(&self) -> impl Iterator<Item = (usize, usize)> {
        let mut rest = self.bits;
        core::iter::from_fn(move || {
            if rest == T::zero() {
                return None;
            }
            let idx = rest.trailing_zeros() as usize;
            rest = rest & (rest - T::one());
            Some((idx / N, idx % N))
        })
    }

    fn bit(row: usize, col: usize) -> Result<T, BitBoardError> {
        if row >= N || col >= N {
            return Err(BitBoardError::IndexOutOfBounds { row, col });
        }
        Ok(T::one() << (row * N + col))
    }
}

impl<T: PrimInt + Unsigned, const N: usize> Default for BitBoard<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PrimInt + Unsigned, const N: usize> fmt::Debug for BitBoard<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter_set_bits()).finish()
    }
}

impl<T: PrimInt + Unsigned, const N: usize> BitAnd for BitBoard<T, N> {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self {
            bits: self.bits & rhs.bits,
        }
    }
}

impl<T: PrimInt + Unsigned, const N: usize> BitOr for BitBoard<T, N> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}
