use crate::core::{
    block_padding, pad_with_zeros, resample_nearest, EdgePolicy, InformativePolicy, RegionMasker,
    TileCounts, Tiler, TilerParams, DEFAULT_BLOCK_SIZE, DEFAULT_MIN_LABELED_PIXELS, DEFAULT_STRIDE,
};
use crate::io::{read_mask, DatasetSink, RasterSource};
use crate::types::{TileError, TileResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Explicit pipeline configuration.
///
/// All roots and policy knobs live here; there is no process-wide mutable
/// state. `mask_root` is optional: when absent the image is tiled unmasked
/// and unpadded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the multispectral source images
    pub image_root: PathBuf,
    /// Directory holding the ground-truth label rasters
    pub label_root: PathBuf,
    /// Directory holding rasterized region-of-interest masks, if any
    pub mask_root: Option<PathBuf>,
    /// Directory the generated tile pairs are written to
    pub destination_root: PathBuf,
    /// Block size the masked image is padded to a multiple of
    pub block_size: usize,
    /// Minimum nonzero label pixels for a tile to be kept
    pub threshold: usize,
    /// Tile edge length and traversal step
    pub stride: usize,
    /// Handling of the sub-stride remainder at the raster edge
    pub edge_policy: EdgePolicy,
}

impl PipelineConfig {
    pub fn new<P: Into<PathBuf>>(image_root: P, label_root: P, destination_root: P) -> Self {
        Self {
            image_root: image_root.into(),
            label_root: label_root.into(),
            mask_root: None,
            destination_root: destination_root.into(),
            block_size: DEFAULT_BLOCK_SIZE,
            threshold: DEFAULT_MIN_LABELED_PIXELS,
            stride: DEFAULT_STRIDE,
            edge_policy: EdgePolicy::Drop,
        }
    }

    pub fn with_mask_root<P: Into<PathBuf>>(mut self, mask_root: P) -> Self {
        self.mask_root = Some(mask_root.into());
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_edge_policy(mut self, edge_policy: EdgePolicy) -> Self {
        self.edge_policy = edge_policy;
        self
    }
}

/// Totals across one generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub emitted: usize,
    pub discarded: usize,
}

impl GenerationSummary {
    fn absorb(&mut self, counts: TileCounts) {
        self.emitted += counts.emitted;
        self.discarded += counts.discarded;
    }
}

/// End-to-end generator: locate the image/label pair for a (region, year),
/// reconcile extents, optionally mask, tile, and persist survivors.
///
/// Execution is single-threaded and synchronous; each unit holds one full
/// image raster and one full label raster in memory for the duration of
/// tiling, and each unit runs to completion before the next begins.
pub struct DatasetGenerator {
    config: PipelineConfig,
    tiler: Tiler,
}

impl DatasetGenerator {
    pub fn new(config: PipelineConfig) -> Self {
        let tiler = Tiler::with_params(TilerParams {
            stride: config.stride,
            policy: InformativePolicy::AbsoluteCount(config.threshold),
            edge_policy: config.edge_policy,
        });
        Self { config, tiler }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Source image path for a (region, year)
    pub fn image_path(&self, region: &str, year: i32) -> PathBuf {
        self.config
            .image_root
            .join(format!("landsat8_{}_region_{}.tif", year, region))
    }

    /// Ground-truth label path for a (region, year)
    pub fn label_path(&self, region: &str, year: i32) -> PathBuf {
        self.config
            .label_root
            .join(format!("{}_{}.tif", region, year))
    }

    /// Rasterized region mask path, when a mask root is configured
    pub fn mask_path(&self, region: &str) -> Option<PathBuf> {
        self.config
            .mask_root
            .as_ref()
            .map(|root| root.join(format!("{}_shapefile.tif", region)))
    }

    /// Process one (region, year) unit end to end.
    ///
    /// `bands` lists the 1-based GDAL band indices to stack. Any
    /// precondition failure aborts this unit; pairs already written remain
    /// intact and complete.
    pub fn generate_region(
        &self,
        region: &str,
        year: i32,
        bands: &[usize],
    ) -> TileResult<GenerationSummary> {
        self.run_region(region, year, bands)
            .map_err(|source| TileError::Region {
                region: region.to_string(),
                year,
                source: Box::new(source),
            })
    }

    fn run_region(&self, region: &str, year: i32, bands: &[usize]) -> TileResult<GenerationSummary> {
        let image_path = self.image_path(region, year);
        let label_path = self.label_path(region, year);
        log::info!(
            "Generating examples for {} {}: image={}, labels={}",
            region,
            year,
            image_path.display(),
            label_path.display()
        );

        let image_source = RasterSource::open(&image_path)?;
        let label_source = RasterSource::open(&label_path)?;

        // reconcile the label grid to the image grid
        let image_extent = image_source.extent();
        let label = label_source.read_labels()?;
        let label = resample_nearest(&label, image_extent);

        let image = image_source.read_stack(bands)?;

        let (image, label) = match self.mask_path(region) {
            Some(mask_path) => {
                let mask = read_mask(&mask_path)?;
                // the mask grid may differ from the image grid too
                let mask = resample_nearest(&mask, image_extent);

                let masker = RegionMasker::with_block_size(self.config.block_size);
                let image = masker.apply(&image, &mask)?;

                // pad the labels identically so both rasters stay aligned
                let rows_pad = block_padding(image_extent.rows, self.config.block_size);
                let cols_pad = block_padding(image_extent.cols, self.config.block_size);
                let label = pad_with_zeros(&label, rows_pad, cols_pad);
                (image, label)
            }
            None => (image, label),
        };

        let sink = DatasetSink::create(&self.config.destination_root)?;
        let counts = self.tiler.for_each_pair(&image, &label, |pair| {
            sink.write(region, year, &pair)?;
            Ok(())
        })?;

        log::info!(
            "{} {}: emitted {} tile pairs, discarded {} low-signal windows",
            region,
            year,
            counts.emitted,
            counts.discarded
        );

        Ok(GenerationSummary {
            emitted: counts.emitted,
            discarded: counts.discarded,
        })
    }

    /// Process a list of regions for one year, sequentially.
    ///
    /// The first failing unit stops the run with a diagnostic naming the
    /// region and year; output already written is left as is.
    pub fn generate<S: AsRef<str>>(
        &self,
        regions: &[S],
        year: i32,
        bands: &[usize],
    ) -> TileResult<GenerationSummary> {
        let mut summary = GenerationSummary::default();
        for region in regions {
            let unit = self.generate_region(region.as_ref(), year, bands)?;
            summary.absorb(TileCounts {
                emitted: unit.emitted,
                discarded: unit.discarded,
            });
        }
        log::info!(
            "Run complete: {} tile pairs across {} regions",
            summary.emitted,
            regions.len()
        );
        Ok(summary)
    }
}

/// Convenience check used by inspection tooling: does a generated tile
/// archive exist for this key?
pub fn tile_exists<P: AsRef<Path>>(destination: P, region: &str, year: i32, sequence: usize) -> bool {
    destination
        .as_ref()
        .join(format!("{}_{}_{}.npz", region, year, sequence))
        .exists()
}
