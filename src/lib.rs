//! # Drainage-tree
//!
//! `drainage-tree` builds drainage trees from D8 flow-direction and flow-accumulation rasters,
//! splits them into streams, and measures how well a second flow-direction raster (often a
//! generalized, coarser one) reproduces the flow paths of the first.
//!
//! Rasters come in as `ndarray` grids with their six geotransform coefficients; reading files
//! is left to the caller (see [`RasterSource`]).
//!
//! ## Example
//!
//! ```
//! use ndarray::array;
//! use drainage_tree::*;
//!
//! // fine grid: two rows draining east, the top one turning south into the bottom one
//! let fine = FlowDirectionGrid::new(
//!     array![
//!         [1, 1, 1, 4],
//!         [1, 1, 1, 0],
//!     ],
//!     PointerScheme::Esri,
//! ).expect("valid pointers");
//! let acc = flow_accumulation(&fine).expect("no loops");
//! let (tree, seeds) = build_tree(&acc, &fine, &TreeParams::new(0)).expect("valid grids");
//! assert_eq!(tree.roots().len(), 1);
//!
//! // coarse grid at twice the cell size, draining east into a sink
//! let coarse = FlowDirectionGrid::new(array![[1, 0]], PointerScheme::Esri).expect("valid pointers");
//! let a = FlowSurface::new(&fine, GeoTransform::new(0.0, 0.0, 1.0, 1.0));
//! let b = FlowSurface::new(&coarse, GeoTransform::new(0.0, 0.0, 2.0, 2.0));
//! let report = compare(&a, &b, seeds.as_slice(), &CompareParams::default()).expect("acyclic");
//! assert_eq!(report.mean_score(), Some(1.0));
//! ```
pub mod analysis;
pub mod compare;
pub mod direction;
pub mod error;
pub mod geotransform;
pub mod raster;
pub mod seeds;
pub mod streams;
pub mod tree;

pub use analysis::{run_analysis, AnalysisConfig, AnalysisReport, SeedSelection};
pub use compare::{
    compare, compare_range, compare_streams, AccuracyReport, CompareParams, FlowSurface,
    PathAgreement, SeedAccuracy, SeedComparison,
};
pub use direction::{flow_accumulation, Flow, FlowDirectionGrid, PointerScheme, DIRECTION_NODATA};
pub use error::{Error, Result};
pub use geotransform::{CoefficientOrder, GeoTransform};
pub use raster::{MemoryRaster, RasterSource};
pub use seeds::{Seed, SeedKind, SeedSet};
pub use streams::{DistanceMetric, Stream, StreamSet};
pub use tree::{build_tree, DrainageTree, Node, NodeId, TreeParams};
