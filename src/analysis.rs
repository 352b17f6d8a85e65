//! The full reference-versus-candidate workflow over injected raster sources.

use log::info;
use num::{ToPrimitive, Zero};

use crate::compare::{
    compare, compare_range, compare_streams, AccuracyReport, CompareParams, FlowSurface,
};
use crate::direction::{FlowDirectionGrid, PointerScheme, DIRECTION_NODATA};
use crate::error::{Error, Result};
use crate::raster::RasterSource;
use crate::seeds::SeedSet;
use crate::streams::{DistanceMetric, StreamSet};
use crate::tree::{build_tree, DrainageTree, TreeParams};

/// Which seeds of the reference tree to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedSelection {
    #[default]
    All,
    Index(usize),
    /// Half-open range of seed indices.
    Range(usize, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig<T> {
    pub threshold: T,
    pub check_accumulation: bool,
    pub reference_scheme: PointerScheme,
    pub candidate_scheme: PointerScheme,
    /// Nodata value of both direction rasters.
    pub direction_nodata: u8,
    pub selection: SeedSelection,
    pub compare: CompareParams,
    pub metric: DistanceMetric,
    /// Also compare every stream of the reference tree.
    pub compare_streams: bool,
}

impl<T: Zero> Default for AnalysisConfig<T> {
    fn default() -> Self {
        Self {
            threshold: T::zero(),
            check_accumulation: true,
            reference_scheme: PointerScheme::Esri,
            candidate_scheme: PointerScheme::Esri,
            direction_nodata: DIRECTION_NODATA,
            selection: SeedSelection::All,
            compare: CompareParams::default(),
            metric: DistanceMetric::Planar,
            compare_streams: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub tree: DrainageTree,
    pub seeds: SeedSet,
    pub streams: StreamSet,
    pub seed_accuracy: AccuracyReport,
    pub stream_accuracy: Option<AccuracyReport>,
}

/// Builds the drainage tree of the reference rasters and scores the candidate directions
/// against it.
///
/// Band 1 of each source is used; each source's coefficients are normalized according to the
/// order it declares.
pub fn run_analysis<A, D, C, T>(
    reference_accumulation: &A,
    reference_direction: &D,
    candidate_direction: &C,
    config: &AnalysisConfig<T>,
) -> Result<AnalysisReport>
where
    A: RasterSource<Elem = T>,
    D: RasterSource<Elem = u8>,
    C: RasterSource<Elem = u8>,
    T: Copy + PartialOrd + ToPrimitive,
{
    let acc = reference_accumulation.read_band(1)?;
    let dir_a = FlowDirectionGrid::with_nodata(
        reference_direction.read_band(1)?,
        config.reference_scheme,
        config.direction_nodata,
    )?;
    let gt_a = reference_direction.transform()?;
    let dir_b = FlowDirectionGrid::with_nodata(
        candidate_direction.read_band(1)?,
        config.candidate_scheme,
        config.direction_nodata,
    )?;
    let gt_b = candidate_direction.transform()?;

    let params = TreeParams::new(config.threshold)
        .with_transform(gt_a)
        .with_accumulation_check(config.check_accumulation);
    let (tree, seeds) = build_tree(&acc, &dir_a, &params)?;
    let streams = tree.streams(config.metric);

    let a = FlowSurface::new(&dir_a, gt_a);
    let b = FlowSurface::new(&dir_b, gt_b);
    let seed_accuracy = match config.selection {
        SeedSelection::All => compare(&a, &b, seeds.as_slice(), &config.compare)?,
        SeedSelection::Index(i) => {
            let end = i
                .checked_add(1)
                .ok_or(Error::SeedOutOfRange { index: i, len: seeds.len() })?;
            compare_range(&a, &b, &seeds, i..end, &config.compare)?
        }
        SeedSelection::Range(s, e) => compare_range(&a, &b, &seeds, s..e, &config.compare)?,
    };
    let stream_accuracy = if config.compare_streams {
        Some(compare_streams(&a, &b, streams.as_slice(), &config.compare)?)
    } else {
        None
    };

    info!(
        "{} seeds, {} streams; compared {} seeds, mean score {:?}",
        seeds.len(),
        streams.len(),
        seed_accuracy.seeds.len(),
        seed_accuracy.mean_score()
    );

    Ok(AnalysisReport { tree, seeds, streams, seed_accuracy, stream_accuracy })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geotransform::CoefficientOrder;
    use crate::raster::MemoryRaster;
    use ndarray::array;

    #[test]
    fn test_selection_out_of_range() {
        let gdal = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let acc = MemoryRaster::new(array![[0u32, 1, 2]], gdal, CoefficientOrder::Gdal);
        let dir = MemoryRaster::new(array![[1u8, 1, 0]], gdal, CoefficientOrder::Gdal);
        let config = AnalysisConfig { selection: SeedSelection::Index(5), ..Default::default() };
        assert_eq!(
            run_analysis(&acc, &dir, &dir, &config).map(|_| ()),
            Err(Error::SeedOutOfRange { index: 5, len: 1 })
        );

        let config =
            AnalysisConfig { selection: SeedSelection::Index(usize::MAX), ..Default::default() };
        assert_eq!(
            run_analysis(&acc, &dir, &dir, &config).map(|_| ()),
            Err(Error::SeedOutOfRange { index: usize::MAX, len: 1 })
        );

        let config = AnalysisConfig { selection: SeedSelection::Index(0), ..Default::default() };
        let report = run_analysis(&acc, &dir, &dir, &config).unwrap();
        assert_eq!(report.seed_accuracy.mean_score(), Some(1.0));
        assert_eq!(report.stream_accuracy, None);
    }
}
