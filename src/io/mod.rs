//! I/O modules for reading rasters and persisting tile pairs

pub mod dataset;
pub mod raster;

pub use dataset::{tile_key, DatasetSink, DatasetSource};
pub use raster::{read_mask, RasterSource};
