//! Agreement between the flow paths of two D8 grids.
//!
//! A seed's path is followed downstream in the reference grid A, and the seed's world position
//! is followed downstream in the candidate grid B.  Every cell of the A path is located in B
//! through the two geotransforms; the score of a seed is the fraction of A cells that land on
//! (or within `tolerance` cells of) the B path.  Working in world coordinates lets the two grids
//! differ in resolution and origin.

use std::collections::HashSet;
use std::ops::Range;

use log::{debug, warn};
use rayon::prelude::*;

use crate::direction::{Flow, FlowDirectionGrid};
use crate::error::{Error, Result};
use crate::geotransform::GeoTransform;
use crate::seeds::{Seed, SeedSet};
use crate::streams::Stream;

/// A direction grid together with where it sits in the world.
#[derive(Debug, Clone, Copy)]
pub struct FlowSurface<'a> {
    pub direction: &'a FlowDirectionGrid,
    pub transform: GeoTransform,
}

impl<'a> FlowSurface<'a> {
    pub fn new(direction: &'a FlowDirectionGrid, transform: GeoTransform) -> Self {
        Self { direction, transform }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareParams {
    /// How many cells (Chebyshev distance, in B) an A cell may miss the B path by and still
    /// count as matched.
    pub tolerance: usize,
    /// Stop following the A path after this many steps.  `None` follows it to the end.
    pub max_steps: Option<usize>,
}

/// How well one path was reproduced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathAgreement {
    /// `matched / steps`, between 0 and 1.
    pub score: f64,
    pub matched: usize,
    /// Cells visited on the A path, the start included.
    pub steps: usize,
    /// Cells on the B path.
    pub candidate_steps: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeedComparison {
    Matched(PathAgreement),
    /// The seed could not be placed on both grids; the error says why.
    NoMatch(Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedAccuracy {
    /// Index of the seed (or stream) in the set it was taken from.
    pub index: usize,
    pub cell: (usize, usize),
    pub outcome: SeedComparison,
}

impl SeedAccuracy {
    pub fn score(&self) -> Option<f64> {
        match &self.outcome {
            SeedComparison::Matched(a) => Some(a.score),
            SeedComparison::NoMatch(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccuracyReport {
    pub seeds: Vec<SeedAccuracy>,
}

impl AccuracyReport {
    pub fn scores(&self) -> Vec<Option<f64>> {
        self.seeds.iter().map(SeedAccuracy::score).collect()
    }

    /// Number of seeds that could be compared.
    pub fn matched(&self) -> usize {
        self.seeds.iter().filter(|s| s.score().is_some()).count()
    }

    /// Mean score over the compared seeds, `None` when none could be compared.
    pub fn mean_score(&self) -> Option<f64> {
        let scores: Vec<f64> = self.seeds.iter().filter_map(SeedAccuracy::score).collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

/// Compares the paths starting at `seeds`, following each to its outlet in A.
///
/// Seeds that fall outside either grid are reported as [`SeedComparison::NoMatch`]; a flow
/// loop met while tracing fails the whole batch with [`Error::CyclicFlowPath`].
pub fn compare(
    a: &FlowSurface,
    b: &FlowSurface,
    seeds: &[Seed],
    params: &CompareParams,
) -> Result<AccuracyReport> {
    let starts: Vec<_> = seeds.iter().map(|s| (s.cell(), None)).collect();
    run(a, b, &starts, 0, params)
}

/// Compares the seeds `range` of `seeds`, failing with [`Error::SeedOutOfRange`] when the range
/// reaches past the end of the set.
///
/// ```
/// use ndarray::array;
/// use drainage_tree::*;
///
/// let dir = FlowDirectionGrid::new(array![[1, 1, 0]], PointerScheme::Esri).unwrap();
/// let (_, seeds) = build_tree(&array![[0, 1, 2]], &dir, &TreeParams::new(0)).unwrap();
/// let surface = FlowSurface::new(&dir, GeoTransform::default());
/// let params = CompareParams::default();
///
/// let report = compare_range(&surface, &surface, &seeds, 0..1, &params).unwrap();
/// assert_eq!(report.mean_score(), Some(1.0));
/// assert!(matches!(
///     compare_range(&surface, &surface, &seeds, 5..6, &params),
///     Err(Error::SeedOutOfRange { .. })
/// ));
/// ```
pub fn compare_range(
    a: &FlowSurface,
    b: &FlowSurface,
    seeds: &SeedSet,
    range: Range<usize>,
    params: &CompareParams,
) -> Result<AccuracyReport> {
    let offset = range.start;
    let selected = seeds.select(range)?;
    let starts: Vec<_> = selected.iter().map(|s| (s.cell(), None)).collect();
    run(a, b, &starts, offset, params)
}

/// Compares streams, following each A path from the stream head down to its mouth only.
pub fn compare_streams(
    a: &FlowSurface,
    b: &FlowSurface,
    streams: &[Stream],
    params: &CompareParams,
) -> Result<AccuracyReport> {
    let starts: Vec<_> = streams.iter().map(|s| (s.head, Some(s.mouth))).collect();
    run(a, b, &starts, 0, params)
}

type Start = ((usize, usize), Option<(usize, usize)>);

fn run(
    a: &FlowSurface,
    b: &FlowSurface,
    starts: &[Start],
    offset: usize,
    params: &CompareParams,
) -> Result<AccuracyReport> {
    let results: Vec<Result<SeedAccuracy>> = starts
        .par_iter()
        .enumerate()
        .map(|(k, &(cell, stop))| {
            let index = offset + k;
            let outcome = match agreement(a, b, cell, stop, params, index) {
                Ok(agreement) => SeedComparison::Matched(agreement),
                Err(e @ Error::CoordinateOutOfBounds { .. }) => {
                    warn!("seed {index} at {cell:?} not compared: {e}");
                    SeedComparison::NoMatch(e)
                }
                Err(e) => return Err(e),
            };
            Ok(SeedAccuracy { index, cell, outcome })
        })
        .collect();
    // first failure by seed index, whichever thread met it first
    let seeds = results.into_iter().collect::<Result<Vec<_>>>()?;

    let report = AccuracyReport { seeds };
    debug!(
        "compared {} seeds, {} matched, mean score {:?}",
        report.seeds.len(),
        report.matched(),
        report.mean_score()
    );
    Ok(report)
}

fn agreement(
    a: &FlowSurface,
    b: &FlowSurface,
    start: (usize, usize),
    stop: Option<(usize, usize)>,
    params: &CompareParams,
    index: usize,
) -> Result<PathAgreement> {
    let (x, y) = a.transform.pixel_to_world(start.0, start.1);
    let out_of_bounds = Error::CoordinateOutOfBounds { seed: index, x, y };
    if !a.direction.is_valid(start.0, start.1) {
        return Err(out_of_bounds);
    }
    let shape_b = b.direction.shape();
    let start_b = match b.transform.world_to_cell(x, y, shape_b) {
        Some((r, c)) if b.direction.is_valid(r, c) => (r, c),
        _ => return Err(out_of_bounds),
    };

    let path_b: HashSet<(usize, usize)> =
        trace(b.direction, start_b, None, None)?.into_iter().collect();
    let path_a = trace(a.direction, start, stop, params.max_steps)?;

    // no B cell is further than the larger grid side away
    let t = params.tolerance.min(shape_b.0.max(shape_b.1));
    let window = (2 * t + 1).saturating_mul(2 * t + 1);
    let on_b_path = |row: usize, col: usize| {
        let (x, y) = a.transform.pixel_to_world(row, col);
        let Some((rb, cb)) = b.transform.world_to_cell(x, y, shape_b) else {
            return false;
        };
        if window > path_b.len() {
            return path_b.iter().any(|&(r, c)| r.abs_diff(rb).max(c.abs_diff(cb)) <= t);
        }
        (rb.saturating_sub(t)..=rb + t)
            .any(|r| (cb.saturating_sub(t)..=cb + t).any(|c| path_b.contains(&(r, c))))
    };
    let matched = path_a.iter().filter(|&&(r, c)| on_b_path(r, c)).count();

    Ok(PathAgreement {
        score: matched as f64 / path_a.len() as f64,
        matched,
        steps: path_a.len(),
        candidate_steps: path_b.len(),
    })
}

/// Cells from `start` downstream to the outlet, to `stop`, or until `max_steps` moves were made.
fn trace(
    direction: &FlowDirectionGrid,
    start: (usize, usize),
    stop: Option<(usize, usize)>,
    max_steps: Option<usize>,
) -> Result<Vec<(usize, usize)>> {
    let mut path = vec![start];
    let mut seen = HashSet::from([start]);
    let mut cell = start;
    while Some(cell) != stop && max_steps.is_none_or(|m| path.len() <= m) {
        let Flow::To(rn, cn) = direction.flow(cell.0, cell.1) else {
            break;
        };
        cell = (rn, cn);
        if !seen.insert(cell) {
            return Err(Error::CyclicFlowPath { row: rn, col: cn });
        }
        path.push(cell);
    }
    Ok(path)
}
