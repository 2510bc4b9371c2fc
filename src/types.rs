use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One band of a multispectral image (rows x cols)
pub type ImageBand = Array2<f32>;

/// Band-last stack of image bands (rows x cols x bands)
pub type ImageStack = Array3<f32>;

/// Single-band categorical ground-truth raster (rows x cols)
pub type LabelRaster = Array2<i32>;

/// Single-band binary region mask, values 0 (excluded) or 1 (included)
pub type MaskRaster = Array2<u8>;

/// Spatial extent of a raster in the canonical (rows, cols) convention.
///
/// Every component in the crate talks in (rows, cols); GDAL's (x, y) sizes
/// are converted at the I/O boundary and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub rows: usize,
    pub cols: usize,
}

impl Extent {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Extent of a 2-D array
    pub fn of<T>(array: &Array2<T>) -> Self {
        let (rows, cols) = array.dim();
        Self { rows, cols }
    }

    pub fn is_multiple_of(&self, block: usize) -> bool {
        block > 0 && self.rows % block == 0 && self.cols % block == 0
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// One image sub-raster and its spatially co-located label sub-raster.
///
/// The sequence number is the only provenance carried; the spatial window of
/// pair `n` is recomputed from the stride and the source extent when needed.
#[derive(Debug, Clone)]
pub struct TilePair {
    /// Image tile, shape (stride, stride, bands)
    pub image: ImageStack,
    /// Label tile, shape (stride, stride)
    pub label: LabelRaster,
    /// Per-(region, year) counter, starting at 1 for the first emitted pair
    pub sequence: usize,
}

/// Error types for tile generation
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Failed to write tile archive: {0}")]
    NpzWrite(#[from] ndarray_npy::WriteNpzError),

    #[error("Failed to read tile archive: {0}")]
    NpzRead(#[from] ndarray_npy::ReadNpzError),

    #[error("Missing input raster: {0}")]
    MissingInput(PathBuf),

    #[error("Extent mismatch in {context}: expected {expected}, got {actual}")]
    ExtentMismatch {
        context: String,
        expected: Extent,
        actual: Extent,
    },

    #[error("Stride must be positive, got {0}")]
    InvalidStride(usize),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Region {region} year {year}: {source}")]
    Region {
        region: String,
        year: i32,
        #[source]
        source: Box<TileError>,
    },
}

/// Result type for tile generation operations
pub type TileResult<T> = Result<T, TileError>;
