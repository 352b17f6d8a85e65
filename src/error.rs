//! Error types for drainage tree construction and comparison

use thiserror::Error;

/// Everything that can go wrong building or comparing drainage networks.
///
/// `DimensionMismatch`, `InvalidTransform`, `InvalidDirectionCode`,
/// `AccumulationDecreases` and `CyclicFlowPath` describe malformed input and abort the whole
/// operation. `CoordinateOutOfBounds` is reported per seed by the comparator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("grid size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    DimensionMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("invalid geotransform: {0}")]
    InvalidTransform(String),

    #[error("invalid D8 direction code {code} at ({row}, {col})")]
    InvalidDirectionCode { row: usize, col: usize, code: u8 },

    #[error("flow path through ({row}, {col}) loops back on itself")]
    CyclicFlowPath { row: usize, col: usize },

    #[error("accumulation decreases from ({row}, {col}) to its downstream cell {downstream:?}")]
    AccumulationDecreases {
        row: usize,
        col: usize,
        downstream: (usize, usize),
    },

    #[error("seed index {index} out of range for {len} seeds")]
    SeedOutOfRange { index: usize, len: usize },

    #[error("seed {seed} at world ({x}, {y}) falls outside the target grid")]
    CoordinateOutOfBounds { seed: usize, x: f64, y: f64 },

    #[error("raster has no band {0}")]
    MissingBand(usize),
}

/// Result type alias for drainage operations
pub type Result<T> = std::result::Result<T, Error>;
