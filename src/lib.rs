//! Tileforge: A Fast, Modular Training-Tile Generator for Satellite Imagery
//!
//! This library prepares supervised-learning training examples from large
//! multi-band satellite rasters and their ground-truth label rasters: it
//! reconciles differing pixel grids by nearest-neighbor resampling, applies
//! an optional region-of-interest mask, partitions both rasters into
//! fixed-size aligned tiles, filters out tiles with insufficient labeled
//! content, and persists each surviving (image, label) pair as one archive.

pub mod core;
pub mod io;
pub mod pipeline;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    Extent, ImageBand, ImageStack, LabelRaster, MaskRaster, TileError, TilePair, TileResult,
};

pub use crate::core::{
    block_padding, pad_with_zeros, resample_nearest, EdgePolicy, InformativePolicy, RegionMasker,
    TileCounts, Tiler, TilerParams, DEFAULT_BLOCK_SIZE, DEFAULT_MIN_LABELED_PIXELS, DEFAULT_STRIDE,
};

pub use io::{read_mask, tile_key, DatasetSink, DatasetSource, RasterSource};

pub use pipeline::{DatasetGenerator, GenerationSummary, PipelineConfig};
