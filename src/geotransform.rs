//! Affine mapping between grid cells and world coordinates.
//!
//! ```text
//! x = origin_x + col * pixel_width  + row * row_rotation
//! y = origin_y + col * col_rotation + row * pixel_height
//! ```

use crate::error::{Error, Result};

/// The order in which six affine coefficients are handed to us.
///
/// Raster libraries disagree here, and callers have been seen passing either, so every
/// ingestion point takes the order explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoefficientOrder {
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
    #[default]
    Gdal,
    /// `[pixel_width, row_rotation, origin_x, col_rotation, pixel_height, origin_y]`,
    /// i.e. the GDAL array permuted by `[1, 2, 0, 4, 5, 3]`.
    Affine,
}

impl CoefficientOrder {
    /// Position of each GDAL coefficient within an array of this order.
    fn positions(self) -> [usize; 6] {
        match self {
            CoefficientOrder::Gdal => [0, 1, 2, 3, 4, 5],
            CoefficientOrder::Affine => [2, 0, 1, 5, 3, 4],
        }
    }

    /// Reorders `coeffs` given in this order into GDAL order.
    pub fn to_gdal(self, coeffs: [f64; 6]) -> [f64; 6] {
        let pos = self.positions();
        let mut out = [0.0; 6];
        for (k, p) in pos.iter().enumerate() {
            out[k] = coeffs[*p];
        }
        out
    }

    /// Reorders GDAL-ordered `coeffs` into this order.
    pub fn from_gdal(self, coeffs: [f64; 6]) -> [f64; 6] {
        let pos = self.positions();
        let mut out = [0.0; 6];
        for (k, p) in pos.iter().enumerate() {
            out[*p] = coeffs[k];
        }
        out
    }
}

/// Affine georeferencing of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X
    pub pixel_width: f64,
    /// Cell size in Y, negative for north-up grids
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform without rotation.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Builds a transform from six coefficients in the declared `order`.
    ///
    /// Fails with [`Error::InvalidTransform`] when there are not exactly six coefficients, when
    /// one of them is not finite, or when the transform cannot be inverted.
    ///
    /// ```
    /// use drainage_tree::{CoefficientOrder, GeoTransform};
    ///
    /// let gdal = [1361171.0, 8.0, 0.0, 5006315.0, 0.0, -8.0];
    /// let affine = [8.0, 0.0, 1361171.0, 0.0, -8.0, 5006315.0];
    /// let a = GeoTransform::from_coefficients(&gdal, CoefficientOrder::Gdal).unwrap();
    /// let b = GeoTransform::from_coefficients(&affine, CoefficientOrder::Affine).unwrap();
    /// assert_eq!(a, b);
    /// ```
    pub fn from_coefficients(coeffs: &[f64], order: CoefficientOrder) -> Result<Self> {
        let coeffs: [f64; 6] = coeffs.try_into().map_err(|_| {
            Error::InvalidTransform(format!("expected 6 coefficients, got {}", coeffs.len()))
        })?;
        if let Some(bad) = coeffs.iter().find(|c| !c.is_finite()) {
            return Err(Error::InvalidTransform(format!("non-finite coefficient {bad}")));
        }
        let g = order.to_gdal(coeffs);
        let gt = Self {
            origin_x: g[0],
            pixel_width: g[1],
            row_rotation: g[2],
            origin_y: g[3],
            col_rotation: g[4],
            pixel_height: g[5],
        };
        let scale = (gt.pixel_width * gt.pixel_height)
            .abs()
            .max((gt.row_rotation * gt.col_rotation).abs());
        if gt.determinant().abs() <= scale * 1e-12 {
            return Err(Error::InvalidTransform(format!(
                "singular transform {:?}",
                gt.to_coefficients(CoefficientOrder::Gdal)
            )));
        }
        Ok(gt)
    }

    pub fn to_coefficients(&self, order: CoefficientOrder) -> [f64; 6] {
        order.from_gdal([
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ])
    }

    fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// World coordinates of the centre of cell (`row`, `col`).
    pub fn pixel_to_world(&self, row: usize, col: usize) -> (f64, f64) {
        let col_f = col as f64 + 0.5;
        let row_f = row as f64 + 0.5;
        (
            self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation,
            self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height,
        )
    }

    /// Fractional (row, col) of a world position.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.determinant();
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;
        (row, col)
    }

    /// The cell of a grid with `shape` (rows, cols) containing world position (`x`, `y`), or
    /// `None` when the position lies outside the grid.
    pub fn world_to_cell(&self, x: f64, y: f64, shape: (usize, usize)) -> Option<(usize, usize)> {
        let (row, col) = self.world_to_pixel(x, y);
        let (row, col) = (row.floor(), col.floor());
        if !(row >= 0.0 && col >= 0.0 && row < shape.0 as f64 && col < shape.1 as f64) {
            return None;
        }
        Some((row as usize, col as usize))
    }
}

impl Default for GeoTransform {
    /// Unit cells with the origin at (0, 0) and y growing downwards with the row index.
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}
