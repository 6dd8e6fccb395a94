//! Main Raster type

use crate::crs::{crs_matches, CRS};
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{Array2, Zip};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform and CRS) and an optional no-data value.
/// For `f64` rasters NaN is always treated as no-data, whether or not a
/// sentinel is declared.
///
/// The set of cells that are not no-data is the raster's *footprint*.
///
/// # Example
///
/// ```ignore
/// use priocomp_core::Raster;
///
/// let mut raster: Raster<f64> = Raster::new(100, 100);
/// raster.set(10, 20, 0.5)?;
/// assert_eq!(raster.valid_count(), 100 * 100);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// Coordinate reference system
    crs: Option<CRS>,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a raster with the same metadata but different data type
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs,
            nodata: None,
        }
    }

    /// Wrap new `f64` data in this raster's georeferencing, with NaN as no-data.
    ///
    /// This is how every derived layer (normalized, ranked, expanded) is produced.
    pub fn derive(&self, data: Array2<f64>) -> Result<Raster<f64>> {
        if data.dim() != self.shape() {
            let (er, ec) = self.shape();
            let (ar, ac) = data.dim();
            return Err(Error::GeometryMismatch(format!(
                "derived data is {}x{}, raster is {}x{}",
                ar, ac, er, ec
            )));
        }
        Ok(Raster {
            data,
            transform: self.transform,
            crs: self.crs,
            nodata: Some(f64::NAN),
        })
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Footprint

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Boolean mask of the footprint (true = valid cell)
    pub fn valid_mask(&self) -> Array2<bool> {
        self.data.map(|&v| !self.is_nodata(v))
    }

    /// Number of valid cells
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }

    /// Valid cell values as `f64`, in row-major order
    pub fn valid_values(&self) -> Vec<f64> {
        self.data
            .iter()
            .filter(|&&v| !self.is_nodata(v))
            .filter_map(|&v| v.to_f64())
            .collect()
    }

    /// Cell values as `f64` with every no-data cell mapped to NaN
    pub fn to_f64_array(&self) -> Array2<f64> {
        self.data.map(|&v| {
            if self.is_nodata(v) {
                f64::NAN
            } else {
                v.to_f64().unwrap_or(f64::NAN)
            }
        })
    }

    /// Describe how `other`'s geometry differs from this raster's, if it does.
    ///
    /// Shape, cell placement (transform) and CRS must all agree.
    pub fn geometry_difference<U: RasterElement>(&self, other: &Raster<U>) -> Option<String> {
        if self.shape() != other.shape() {
            let (er, ec) = self.shape();
            let (ar, ac) = other.shape();
            return Some(format!("shape {}x{} vs {}x{}", er, ec, ar, ac));
        }
        if !self.transform.approx_eq(other.transform()) {
            return Some(format!(
                "transform {:?} vs {:?}",
                self.transform.to_gdal(),
                other.transform().to_gdal()
            ));
        }
        if !crs_matches(self.crs(), other.crs()) {
            let name = |c: Option<&CRS>| c.map_or("none".to_string(), |c| c.identifier());
            return Some(format!("CRS {} vs {}", name(self.crs()), name(other.crs())));
        }
        None
    }

    /// Fail with [`Error::GeometryMismatch`] unless `other` shares this raster's geometry
    pub fn ensure_same_geometry<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        match self.geometry_difference(other) {
            Some(reason) => Err(Error::GeometryMismatch(reason)),
            None => Ok(()),
        }
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count: usize = 0;

        for v in self.valid_values() {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        let (min, max, mean) = if count > 0 {
            (Some(min), Some(max), Some(sum / count as f64))
        } else {
            (None, None, None)
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

impl Raster<f64> {
    /// Apply `f` to every valid cell, keeping no-data cells as NaN.
    pub fn map_valid<F>(&self, f: F) -> Raster<f64>
    where
        F: Fn(f64) -> f64,
    {
        let mut out = Array2::from_elem(self.shape(), f64::NAN);
        Zip::from(&mut out).and(&self.data).for_each(|o, &v| {
            if !self.is_nodata(v) {
                *o = f(v);
            }
        });
        Raster {
            data: out,
            transform: self.transform,
            crs: self.crs,
            nodata: Some(f64::NAN),
        }
    }
}

/// Basic statistics over a raster's valid cells
#[derive(Debug, Clone)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
