use crate::types::{Extent, ImageStack, MaskRaster, TileError, TileResult};
use ndarray::{s, Array2, Array3, Axis, Zip};
use num_traits::Zero;

/// Default block size the masked image is padded to a multiple of
pub const DEFAULT_BLOCK_SIZE: usize = 128;

/// Symmetric zero-padding amounts that bring `dim` up to the next multiple
/// of `block`: before gets the floor share, after absorbs any odd remainder.
pub fn block_padding(dim: usize, block: usize) -> (usize, usize) {
    debug_assert!(block > 0, "block size must be positive");
    let target = ((dim + block - 1) / block) * block;
    let total = target - dim;
    (total / 2, total - total / 2)
}

/// Zero-pad a 2-D array by the given (top, bottom) and (left, right) amounts.
pub fn pad_with_zeros<T: Clone + Zero>(
    array: &Array2<T>,
    (top, bottom): (usize, usize),
    (left, right): (usize, usize),
) -> Array2<T> {
    let (rows, cols) = array.dim();
    let mut out = Array2::from_elem((rows + top + bottom, cols + left + right), T::zero());
    out.slice_mut(s![top..top + rows, left..left + cols])
        .assign(array);
    out
}

/// Applies a binary region-of-interest mask to a band stack and pads the
/// result to a block-aligned extent.
///
/// Masking is element-wise: pixels where the mask is 0 become 0 in every
/// band. Padding is symmetric per axis (see [`block_padding`]) and fills
/// with 0, so padded pixels carry no label signal downstream.
pub struct RegionMasker {
    block_size: usize,
}

impl RegionMasker {
    /// Create a masker with the default block size of 128
    pub fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_block_size(block_size: usize) -> Self {
        debug_assert!(block_size > 0, "block size must be positive");
        Self { block_size }
    }

    /// The extent a raster of `extent` will have after padding
    pub fn padded_extent(&self, extent: Extent) -> Extent {
        let (top, bottom) = block_padding(extent.rows, self.block_size);
        let (left, right) = block_padding(extent.cols, self.block_size);
        Extent::new(extent.rows + top + bottom, extent.cols + left + right)
    }

    /// Mask every band of `image` and pad the stack to the next block
    /// multiple on both spatial axes.
    ///
    /// The mask extent must equal the image extent; a mismatch means the
    /// caller skipped upstream reconciliation and aborts the unit.
    pub fn apply(&self, image: &ImageStack, mask: &MaskRaster) -> TileResult<ImageStack> {
        let (rows, cols, bands) = image.dim();
        let mask_extent = Extent::of(mask);
        if (mask_extent.rows, mask_extent.cols) != (rows, cols) {
            return Err(TileError::ExtentMismatch {
                context: "region mask vs image bands".to_string(),
                expected: Extent::new(rows, cols),
                actual: mask_extent,
            });
        }

        let (top, bottom) = block_padding(rows, self.block_size);
        let (left, right) = block_padding(cols, self.block_size);
        let out_rows = rows + top + bottom;
        let out_cols = cols + left + right;

        log::debug!(
            "Masking {} bands, padding {}x{} -> {}x{} (block {})",
            bands,
            rows,
            cols,
            out_rows,
            out_cols,
            self.block_size
        );

        let mut out = Array3::<f32>::zeros((out_rows, out_cols, bands));
        for (k, band) in image.axis_iter(Axis(2)).enumerate() {
            let mut target = out.slice_mut(s![top..top + rows, left..left + cols, k]);
            Zip::from(&mut target)
                .and(&band)
                .and(mask)
                .for_each(|o, &v, &m| *o = v * m as f32);
        }

        Ok(out)
    }
}

impl Default for RegionMasker {
    fn default() -> Self {
        Self::new()
    }
}
