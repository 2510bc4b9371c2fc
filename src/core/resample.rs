use crate::types::Extent;
use ndarray::Array2;

/// Nearest-neighbor resampling of a 2-D raster to an arbitrary target extent.
///
/// Used to reconcile a label raster to the pixel grid of its image before
/// tiling. Nearest-neighbor is mandatory here: label values are categorical
/// and interpolation would invent classes that exist in neither source pixel.
/// Every output pixel is a copy of some source pixel.
///
/// A non-positive target extent is a precondition violation, not a runtime
/// error; callers derive the target from an opened raster, which always has
/// positive dimensions.
pub fn resample_nearest<T: Copy>(source: &Array2<T>, target: Extent) -> Array2<T> {
    debug_assert!(
        target.rows > 0 && target.cols > 0,
        "target extent must be positive"
    );

    let (src_rows, src_cols) = source.dim();
    if (src_rows, src_cols) == (target.rows, target.cols) {
        return source.clone();
    }

    log::debug!(
        "Resampling {}x{} -> {} (nearest)",
        src_rows,
        src_cols,
        target
    );

    let row_scale = src_rows as f64 / target.rows as f64;
    let col_scale = src_cols as f64 / target.cols as f64;

    // Pixel-center mapping, clamped so the last output row/col never reads
    // past the source edge.
    Array2::from_shape_fn((target.rows, target.cols), |(r, c)| {
        let sr = (((r as f64 + 0.5) * row_scale) as usize).min(src_rows - 1);
        let sc = (((c as f64 + 0.5) * col_scale) as usize).min(src_cols - 1);
        source[[sr, sc]]
    })
}
