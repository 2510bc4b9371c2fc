use crate::types::{ImageStack, LabelRaster, TilePair, TileResult};
use ndarray_npy::{NpzReader, NpzWriter};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Addressable key of one persisted tile pair
pub fn tile_key(region: &str, year: i32, sequence: usize) -> String {
    format!("{}_{}_{}", region, year, sequence)
}

/// Persists tile pairs, one `.npz` archive per pair.
///
/// Each archive holds an `image` array (stride x stride x bands, f32) and a
/// `label` array (stride x stride, i32) and is addressable by
/// `{region}_{year}_{sequence}`. Pairs are written whole; a crashed run
/// leaves previously written pairs intact.
pub struct DatasetSink {
    destination: PathBuf,
}

impl DatasetSink {
    /// Create a sink rooted at `destination`, creating the directory
    /// idempotently if absent.
    pub fn create<P: AsRef<Path>>(destination: P) -> TileResult<Self> {
        let destination = destination.as_ref().to_path_buf();
        if !destination.exists() {
            log::info!("Creating destination directory: {}", destination.display());
        }
        std::fs::create_dir_all(&destination)?;
        Ok(Self { destination })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Path a pair with the given key components will be written to
    pub fn tile_path(&self, region: &str, year: i32, sequence: usize) -> PathBuf {
        self.destination
            .join(format!("{}.npz", tile_key(region, year, sequence)))
    }

    /// Write one tile pair as a whole unit, returning its path
    pub fn write(&self, region: &str, year: i32, pair: &TilePair) -> TileResult<PathBuf> {
        let path = self.tile_path(region, year, pair.sequence);
        let mut npz = NpzWriter::new(File::create(&path)?);
        npz.add_array("image", &pair.image)?;
        npz.add_array("label", &pair.label)?;
        npz.finish()?;
        log::debug!("Saved {}", path.display());
        Ok(path)
    }
}

/// Reads persisted tile pairs back for inspection tooling
pub struct DatasetSource;

impl DatasetSource {
    /// Read one tile pair archive
    pub fn read<P: AsRef<Path>>(path: P) -> TileResult<(ImageStack, LabelRaster)> {
        let mut npz = NpzReader::new(File::open(path.as_ref())?)?;
        let image: ImageStack = npz.by_name("image")?;
        let label: LabelRaster = npz.by_name("label")?;
        Ok((image, label))
    }
}
