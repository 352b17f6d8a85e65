//! Notable cells of a drainage network, kept in a stable, indexable order.

use std::ops::{Bound, RangeBounds};

use crate::error::{Error, Result};

/// Why a cell was picked as a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    /// Accumulation reaches the channel threshold here and at none of its upstream cells.
    ChannelHead,
    /// Two or more channel cells drain into this one.
    Confluence,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    pub row: usize,
    pub col: usize,
    pub kind: SeedKind,
    pub accumulation: f64,
}

impl Seed {
    pub fn cell(&self) -> (usize, usize) {
        (self.row, self.col)
    }
}

/// Seeds in row-major order of their cells.
///
/// The order only depends on the input grids, so an index into one `SeedSet` names the same
/// cell in every set built from the same rasters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeedSet {
    seeds: Vec<Seed>,
}

impl SeedSet {
    pub(crate) fn new(seeds: Vec<Seed>) -> Self {
        Self { seeds }
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    pub fn as_slice(&self) -> &[Seed] {
        &self.seeds
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Seed> {
        self.seeds.iter()
    }

    pub fn get(&self, index: usize) -> Result<&Seed> {
        self.seeds
            .get(index)
            .ok_or(Error::SeedOutOfRange { index, len: self.seeds.len() })
    }

    /// A contiguous run of seeds, e.g. `set.select(2..5)` or `set.select(3..=3)`.
    pub fn select<R: RangeBounds<usize>>(&self, range: R) -> Result<&[Seed]> {
        let len = self.seeds.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => {
                s.checked_add(1).ok_or(Error::SeedOutOfRange { index: s, len })?
            }
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => {
                e.checked_add(1).ok_or(Error::SeedOutOfRange { index: e, len })?
            }
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        };
        if end > len {
            return Err(Error::SeedOutOfRange { index: end - 1, len });
        }
        if start > end {
            return Err(Error::SeedOutOfRange { index: start, len });
        }
        Ok(&self.seeds[start..end])
    }

    /// Seeds of one kind, with their index in the full set.
    pub fn of_kind(&self, kind: SeedKind) -> impl Iterator<Item = (usize, &Seed)> {
        self.seeds.iter().enumerate().filter(move |(_, s)| s.kind == kind)
    }
}

impl<'a> IntoIterator for &'a SeedSet {
    type Item = &'a Seed;
    type IntoIter = std::slice::Iter<'a, Seed>;

    fn into_iter(self) -> Self::IntoIter {
        self.seeds.iter()
    }
}
