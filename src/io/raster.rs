use crate::types::{Extent, ImageBand, ImageStack, LabelRaster, MaskRaster, TileError, TileResult};
use gdal::Dataset;
use ndarray::{s, Array2, Array3};
use std::path::{Path, PathBuf};

/// GDAL-backed source of raster bands.
///
/// Axis convention: GDAL reports (x, y) sizes and takes (x, y) offsets; this
/// wrapper converts to the crate's (rows, cols) convention at every call so
/// the rest of the pipeline never sees width/height ordering.
pub struct RasterSource {
    dataset: Dataset,
    path: PathBuf,
}

impl RasterSource {
    /// Open a raster file. A missing path is reported before GDAL gets
    /// involved so the diagnostic names the offending file.
    pub fn open<P: AsRef<Path>>(path: P) -> TileResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(TileError::MissingInput(path));
        }
        log::info!("Opening raster: {}", path.display());
        let dataset = Dataset::open(&path)?;
        Ok(Self { dataset, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Spatial extent in (rows, cols)
    pub fn extent(&self) -> Extent {
        let (width, height) = self.dataset.raster_size();
        Extent::new(height, width)
    }

    pub fn band_count(&self) -> usize {
        self.dataset.raster_count() as usize
    }

    /// Read one full band as f32 (1-based GDAL band index)
    pub fn read_band(&self, band: usize) -> TileResult<ImageBand> {
        let extent = self.extent();
        self.read_window(band, 0, 0, extent.rows, extent.cols)
    }

    /// Read an arbitrary rectangular window of one band as f32
    pub fn read_window(
        &self,
        band: usize,
        row_off: usize,
        col_off: usize,
        rows: usize,
        cols: usize,
    ) -> TileResult<ImageBand> {
        let rasterband = self.dataset.rasterband(band as isize)?;
        let buffer = rasterband.read_as::<f32>(
            (col_off as isize, row_off as isize),
            (cols, rows),
            (cols, rows),
            None,
        )?;
        let data = Array2::from_shape_vec((rows, cols), buffer.data)?;
        Ok(data)
    }

    /// Read the listed bands (1-based GDAL indices) into one band-last stack
    pub fn read_stack(&self, bands: &[usize]) -> TileResult<ImageStack> {
        if bands.is_empty() {
            return Err(TileError::Processing(format!(
                "No bands requested from {}",
                self.path.display()
            )));
        }
        let extent = self.extent();
        log::debug!(
            "Reading {} bands of {} ({})",
            bands.len(),
            self.path.display(),
            extent
        );

        let mut stack = Array3::<f32>::zeros((extent.rows, extent.cols, bands.len()));
        for (k, &band) in bands.iter().enumerate() {
            let data = self.read_band(band)?;
            stack.slice_mut(s![.., .., k]).assign(&data);
        }
        Ok(stack)
    }

    /// Read band 1 as a categorical label raster
    pub fn read_labels(&self) -> TileResult<LabelRaster> {
        let extent = self.extent();
        let rasterband = self.dataset.rasterband(1)?;
        let buffer = rasterband.read_as::<i32>(
            (0, 0),
            (extent.cols, extent.rows),
            (extent.cols, extent.rows),
            None,
        )?;
        let data = Array2::from_shape_vec((extent.rows, extent.cols), buffer.data)?;
        Ok(data)
    }
}

/// Read a single-band region mask, normalizing any nonzero value to 1.
///
/// Mask rasters must carry exactly one band; anything else is a malformed
/// input and aborts the unit.
pub fn read_mask<P: AsRef<Path>>(path: P) -> TileResult<MaskRaster> {
    let source = RasterSource::open(path)?;
    let band_count = source.band_count();
    if band_count != 1 {
        return Err(TileError::Processing(format!(
            "Mask raster {} must have exactly one band, found {}",
            source.path().display(),
            band_count
        )));
    }

    let extent = source.extent();
    let rasterband = source.dataset.rasterband(1)?;
    let buffer = rasterband.read_as::<u8>(
        (0, 0),
        (extent.cols, extent.rows),
        (extent.cols, extent.rows),
        None,
    )?;
    let mut mask = Array2::from_shape_vec((extent.rows, extent.cols), buffer.data)?;
    mask.mapv_inplace(|v| (v != 0) as u8);
    Ok(mask)
}
