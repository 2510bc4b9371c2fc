//! Core raster alignment and tiling modules

pub mod mask;
pub mod resample;
pub mod tile;

// Re-export main types
pub use mask::{block_padding, pad_with_zeros, RegionMasker, DEFAULT_BLOCK_SIZE};
pub use resample::resample_nearest;
pub use tile::{
    EdgePolicy, InformativePolicy, TileCounts, Tiler, TilerParams, DEFAULT_MIN_LABELED_PIXELS,
    DEFAULT_STRIDE,
};
