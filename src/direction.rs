//! D8 flow-direction grids.

use std::collections::VecDeque;

use log::debug;
use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Default nodata value of direction rasters.
pub const DIRECTION_NODATA: u8 = 255;

/// (row, col) offsets for codes 1, 2, 4, .., 128 in the Esri scheme.
const ESRI_OFFSETS: [(isize, isize); 8] = [
    (0, 1),   // 1: E
    (1, 1),   // 2: SE
    (1, 0),   // 4: S
    (1, -1),  // 8: SW
    (0, -1),  // 16: W
    (-1, -1), // 32: NW
    (-1, 0),  // 64: N
    (-1, 1),  // 128: NE
];

/// (row, col) offsets for codes 1, 2, 4, .., 128 in the Whitebox scheme.
const WHITEBOX_OFFSETS: [(isize, isize); 8] = [
    (-1, 1),  // 1: NE
    (0, 1),   // 2: E
    (1, 1),   // 4: SE
    (1, 0),   // 8: S
    (1, -1),  // 16: SW
    (0, -1),  // 32: W
    (-1, -1), // 64: NW
    (-1, 0),  // 128: N
];

/// Which neighbour each power-of-two pointer value names.  `0` is a sink in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerScheme {
    /// 1=E, 2=SE, 4=S, 8=SW, 16=W, 32=NW, 64=N, 128=NE
    #[default]
    Esri,
    /// 1=NE, 2=E, 4=SE, 8=S, 16=SW, 32=W, 64=NW, 128=N
    Whitebox,
}

impl PointerScheme {
    fn offsets(self) -> &'static [(isize, isize); 8] {
        match self {
            PointerScheme::Esri => &ESRI_OFFSETS,
            PointerScheme::Whitebox => &WHITEBOX_OFFSETS,
        }
    }

    /// Row and column offset for a pointer value, `None` for sinks and unknown values.
    pub fn offset(self, code: u8) -> Option<(isize, isize)> {
        if !code.is_power_of_two() {
            return None;
        }
        Some(self.offsets()[code.trailing_zeros() as usize])
    }

    /// Pointer value for flowing by (`dr`, `dc`).
    pub fn code_for(self, dr: isize, dc: isize) -> Option<u8> {
        self.offsets()
            .iter()
            .position(|&o| o == (dr, dc))
            .map(|k| 1u8 << k)
    }
}

/// Where a cell sends its flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// The cell is nodata and takes no part in the network.
    NoData,
    /// Flow leaves the modelled area here: a sink, an edge cell pointing off-grid, or a cell
    /// pointing into nodata.
    Outlet,
    /// Flow continues into this (row, col).
    To(usize, usize),
}

/// A D8 pointer raster with its encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowDirectionGrid {
    data: Array2<u8>,
    scheme: PointerScheme,
    nodata: u8,
}

impl FlowDirectionGrid {
    /// Wraps `data`, using [`DIRECTION_NODATA`] as nodata.
    pub fn new(data: Array2<u8>, scheme: PointerScheme) -> Result<Self> {
        Self::with_nodata(data, scheme, DIRECTION_NODATA)
    }

    /// Wraps `data`, checking every cell is `0`, `nodata` or a pointer value.
    pub fn with_nodata(data: Array2<u8>, scheme: PointerScheme, nodata: u8) -> Result<Self> {
        if let Some(((row, col), &code)) = data
            .indexed_iter()
            .find(|&(_, &c)| c != 0 && c != nodata && !c.is_power_of_two())
        {
            return Err(Error::InvalidDirectionCode { row, col, code });
        }
        Ok(Self { data, scheme, nodata })
    }

    pub fn data(&self) -> &Array2<u8> {
        &self.data
    }

    pub fn scheme(&self) -> PointerScheme {
        self.scheme
    }

    pub fn nodata(&self) -> u8 {
        self.nodata
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.data.nrows() && col < self.data.ncols()
    }

    /// True for in-bounds cells that are not nodata.
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.contains(row, col) && self.data[[row, col]] != self.nodata
    }

    /// Where cell (`row`, `col`) drains to.  Out-of-bounds cells are treated as nodata.
    pub fn flow(&self, row: usize, col: usize) -> Flow {
        if !self.is_valid(row, col) {
            return Flow::NoData;
        }
        let Some((dr, dc)) = self.scheme.offset(self.data[[row, col]]) else {
            return Flow::Outlet;
        };
        let rn = row as isize + dr;
        let cn = col as isize + dc;
        if rn < 0 || cn < 0 {
            return Flow::Outlet;
        }
        let (rn, cn) = (rn as usize, cn as usize);
        if !self.is_valid(rn, cn) {
            return Flow::Outlet;
        }
        Flow::To(rn, cn)
    }

    /// Downstream cell of every cell in row-major order, computed a row at a time in parallel.
    pub(crate) fn flows(&self) -> Vec<Flow> {
        let columns = self.data.ncols();
        (0..self.data.nrows())
            .into_par_iter()
            .flat_map_iter(|row| (0..columns).map(move |col| self.flow(row, col)))
            .collect()
    }
}

/// Number of upstream cells draining through each cell.
///
/// Headwater cells get 0, as do nodata cells.  Fails with [`Error::CyclicFlowPath`] when some
/// cells never drain to an outlet.
///
/// ```
/// use ndarray::array;
/// use drainage_tree::{flow_accumulation, FlowDirectionGrid, PointerScheme};
///
/// // everything runs east along one row
/// let dir = FlowDirectionGrid::new(array![[1, 1, 1, 0]], PointerScheme::Esri).unwrap();
/// let acc = flow_accumulation(&dir).unwrap();
/// assert_eq!(acc, array![[0, 1, 2, 3]]);
/// ```
pub fn flow_accumulation(direction: &FlowDirectionGrid) -> Result<Array2<u32>> {
    let (rows, columns) = direction.shape();
    let flows = direction.flows();

    let mut in_degree = vec![0u32; rows * columns];
    for f in &flows {
        if let Flow::To(rn, cn) = *f {
            in_degree[rn * columns + cn] += 1;
        }
    }

    let mut acc = Array2::<u32>::zeros((rows, columns));
    let mut released = 0usize;
    let mut valid = 0usize;
    let mut queue = VecDeque::new();
    for (k, f) in flows.iter().enumerate() {
        if *f != Flow::NoData {
            valid += 1;
            if in_degree[k] == 0 {
                queue.push_back((k / columns, k % columns));
            }
        }
    }

    while let Some((row, col)) = queue.pop_front() {
        released += 1;
        if let Flow::To(rn, cn) = flows[row * columns + col] {
            acc[[rn, cn]] += acc[[row, col]] + 1;
            let kn = rn * columns + cn;
            in_degree[kn] -= 1;
            if in_degree[kn] == 0 {
                queue.push_back((rn, cn));
            }
        }
    }

    if released < valid {
        // whatever is left still waits on an upstream cell, so it sits on or below a loop
        if let Some(k) = (0..rows * columns).find(|&k| flows[k] != Flow::NoData && in_degree[k] > 0)
        {
            return Err(Error::CyclicFlowPath { row: k / columns, col: k % columns });
        }
    }
    debug!("flow accumulation over {rows}x{columns} grid, {valid} valid cells");

    Ok(acc)
}
