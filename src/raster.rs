//! Where grids come from.
//!
//! File formats stay outside this crate: anything that can hand over a band as an
//! `Array2` plus its six transform coefficients can drive the analysis.

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::geotransform::{CoefficientOrder, GeoTransform};

pub trait RasterSource {
    type Elem;

    /// Band `band`, counted from 1.
    fn read_band(&self, band: usize) -> Result<Array2<Self::Elem>>;

    /// The six transform coefficients, in [`RasterSource::coefficient_order`].
    fn coefficients(&self) -> [f64; 6];

    fn coefficient_order(&self) -> CoefficientOrder;

    fn transform(&self) -> Result<GeoTransform> {
        GeoTransform::from_coefficients(&self.coefficients(), self.coefficient_order())
    }
}

/// A raster already in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRaster<T> {
    bands: Vec<Array2<T>>,
    coefficients: [f64; 6],
    order: CoefficientOrder,
}

impl<T> MemoryRaster<T> {
    pub fn new(band: Array2<T>, coefficients: [f64; 6], order: CoefficientOrder) -> Self {
        Self { bands: vec![band], coefficients, order }
    }

    pub fn push_band(&mut self, band: Array2<T>) {
        self.bands.push(band);
    }
}

impl<T: Clone> RasterSource for MemoryRaster<T> {
    type Elem = T;

    fn read_band(&self, band: usize) -> Result<Array2<T>> {
        band.checked_sub(1)
            .and_then(|k| self.bands.get(k))
            .cloned()
            .ok_or(Error::MissingBand(band))
    }

    fn coefficients(&self) -> [f64; 6] {
        self.coefficients
    }

    fn coefficient_order(&self) -> CoefficientOrder {
        self.order
    }
}
