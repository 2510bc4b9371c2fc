use crate::core::mask::pad_with_zeros;
use crate::types::{Extent, ImageStack, LabelRaster, TileError, TilePair, TileResult};
use ndarray::{s, Array3, ArrayView2};
use serde::{Deserialize, Serialize};

/// Default edge length of extracted square tiles
pub const DEFAULT_STRIDE: usize = 256;

/// Default minimum count of nonzero label pixels for a tile to be kept,
/// roughly 1% of a 256x256 tile
pub const DEFAULT_MIN_LABELED_PIXELS: usize = 600;

/// Rule deciding whether a label tile carries enough signal to keep.
///
/// The absolute-count default intentionally favors recall of any window with
/// real label signal over strict density normalization; `MinFraction` is the
/// density-based alternative for callers that tile at other sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InformativePolicy {
    /// Keep tiles with at least this many nonzero label pixels
    AbsoluteCount(usize),
    /// Keep tiles where at least this fraction of label pixels is nonzero
    MinFraction(f32),
}

impl InformativePolicy {
    pub fn is_informative(&self, label_tile: &ArrayView2<i32>) -> bool {
        let nonzero = label_tile.iter().filter(|&&v| v != 0).count();
        match *self {
            // a count exactly at the threshold is kept
            InformativePolicy::AbsoluteCount(min) => nonzero >= min,
            InformativePolicy::MinFraction(fraction) => {
                nonzero as f32 >= fraction * label_tile.len() as f32
            }
        }
    }
}

impl Default for InformativePolicy {
    fn default() -> Self {
        InformativePolicy::AbsoluteCount(DEFAULT_MIN_LABELED_PIXELS)
    }
}

/// What to do with the remainder strip when the raster extent is not an
/// exact multiple of the stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgePolicy {
    /// Silently drop the bottom/right remainder (no partial tiles)
    Drop,
    /// Zero-pad the bottom and right edges up to the next stride multiple so
    /// edge content is still covered by full tiles
    PadToStride,
}

impl Default for EdgePolicy {
    fn default() -> Self {
        EdgePolicy::Drop
    }
}

/// Tiling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilerParams {
    /// Tile edge length and step between tile origins (tiles never overlap)
    pub stride: usize,
    /// Information-content filter applied to each label tile
    pub policy: InformativePolicy,
    /// Handling of the sub-stride remainder at the bottom/right edge
    pub edge_policy: EdgePolicy,
}

impl Default for TilerParams {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            policy: InformativePolicy::default(),
            edge_policy: EdgePolicy::default(),
        }
    }
}

/// Counts reported by one tiling pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCounts {
    /// Pairs that passed the filter and were emitted
    pub emitted: usize,
    /// Candidate windows rejected by the information-content filter
    pub discarded: usize,
}

/// Deterministic partitioning of an image/label raster pair into aligned,
/// non-overlapping square tiles.
///
/// Traversal is row-major over `(Y / stride) x (X / stride)` windows. The
/// label tile is inspected first; windows that fail the information-content
/// filter are skipped without touching the image. Emitted pairs are numbered
/// consecutively from 1, counting only survivors, so the sequence number
/// doubles as the persisted dataset index.
pub struct Tiler {
    params: TilerParams,
}

impl Tiler {
    /// Create a tiler with default parameters (stride 256, absolute-count
    /// filter at 600 pixels, edge remainder dropped)
    pub fn new() -> Self {
        Self {
            params: TilerParams::default(),
        }
    }

    pub fn with_params(params: TilerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TilerParams {
        &self.params
    }

    /// Extract all surviving tile pairs into a vector
    pub fn extract(&self, image: &ImageStack, label: &LabelRaster) -> TileResult<Vec<TilePair>> {
        let mut pairs = Vec::new();
        self.for_each_pair(image, label, |pair| {
            pairs.push(pair);
            Ok(())
        })?;
        Ok(pairs)
    }

    /// Walk the raster pair and hand each surviving tile pair to `emit`.
    ///
    /// Inputs must already share one extent; a mismatch is a reconciliation
    /// failure upstream and aborts the unit. NaN values in the image tile
    /// are replaced with 0 before emission.
    pub fn for_each_pair<F>(
        &self,
        image: &ImageStack,
        label: &LabelRaster,
        mut emit: F,
    ) -> TileResult<TileCounts>
    where
        F: FnMut(TilePair) -> TileResult<()>,
    {
        let stride = self.params.stride;
        if stride == 0 {
            return Err(TileError::InvalidStride(stride));
        }

        let (img_rows, img_cols, _) = image.dim();
        let label_extent = Extent::of(label);
        if (label_extent.rows, label_extent.cols) != (img_rows, img_cols) {
            return Err(TileError::ExtentMismatch {
                context: "label raster vs image raster".to_string(),
                expected: Extent::new(img_rows, img_cols),
                actual: label_extent,
            });
        }

        let padded_image;
        let padded_label;
        let (image, label) = match self.params.edge_policy {
            EdgePolicy::Drop => (image.view(), label.view()),
            EdgePolicy::PadToStride => {
                let pad_rows = (stride - img_rows % stride) % stride;
                let pad_cols = (stride - img_cols % stride) % stride;
                padded_image = pad_stack_after(image, pad_rows, pad_cols);
                padded_label = pad_with_zeros(label, (0, pad_rows), (0, pad_cols));
                (padded_image.view(), padded_label.view())
            }
        };

        let (rows_total, cols_total, bands) = image.dim();
        let rows = rows_total / stride;
        let cols = cols_total / stride;

        log::debug!(
            "Tiling {}x{}x{} with stride {}: {}x{} candidate windows",
            rows_total,
            cols_total,
            bands,
            stride,
            rows,
            cols
        );

        let mut sequence = 0usize;
        let mut discarded = 0usize;

        for i in 0..rows {
            for j in 0..cols {
                let (r0, r1) = (i * stride, (i + 1) * stride);
                let (c0, c1) = (j * stride, (j + 1) * stride);

                let label_tile = label.slice(s![r0..r1, c0..c1]);
                if !self.params.policy.is_informative(&label_tile) {
                    log::debug!("Dropping low-signal window ({}, {})", i, j);
                    discarded += 1;
                    continue;
                }

                let mut image_tile = image.slice(s![r0..r1, c0..c1, ..]).to_owned();
                image_tile.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });

                sequence += 1;
                emit(TilePair {
                    image: image_tile,
                    label: label_tile.to_owned(),
                    sequence,
                })?;
            }
        }

        Ok(TileCounts {
            emitted: sequence,
            discarded,
        })
    }
}

impl Default for Tiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Zero-pad a band stack on the bottom and right spatial edges only
fn pad_stack_after(image: &ImageStack, pad_rows: usize, pad_cols: usize) -> ImageStack {
    if pad_rows == 0 && pad_cols == 0 {
        return image.clone();
    }
    let (rows, cols, bands) = image.dim();
    let mut out = Array3::<f32>::zeros((rows + pad_rows, cols + pad_cols, bands));
    out.slice_mut(s![..rows, ..cols, ..]).assign(image);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn label_with_nonzero(rows: usize, cols: usize, window: (usize, usize, usize), count: usize) -> LabelRaster {
        // place `count` nonzero pixels inside the stride-aligned window (i, j, stride)
        let mut label = Array2::<i32>::zeros((rows, cols));
        let (i, j, stride) = window;
        let mut placed = 0;
        'outer: for r in i * stride..(i + 1) * stride {
            for c in j * stride..(j + 1) * stride {
                if placed == count {
                    break 'outer;
                }
                label[[r, c]] = 1;
                placed += 1;
            }
        }
        label
    }

    #[test]
    fn test_candidate_count_is_floor_division() {
        let image = Array3::<f32>::zeros((520, 260, 2));
        let label = Array2::<i32>::ones((520, 260));

        let tiler = Tiler::with_params(TilerParams {
            stride: 256,
            policy: InformativePolicy::AbsoluteCount(0),
            edge_policy: EdgePolicy::Drop,
        });
        let counts = tiler.for_each_pair(&image, &label, |_| Ok(())).unwrap();

        // 520/256 = 2, 260/256 = 1; the remainder strips are dropped
        assert_eq!(counts.emitted + counts.discarded, 2);
        assert_eq!(counts.emitted, 2);
    }

    #[test]
    fn test_threshold_boundary() {
        let tiler = Tiler::new();
        let image = Array3::<f32>::zeros((256, 256, 1));

        let at_threshold = label_with_nonzero(256, 256, (0, 0, 256), 600);
        let counts = tiler.for_each_pair(&image, &at_threshold, |_| Ok(())).unwrap();
        assert_eq!(counts.emitted, 1);

        let below_threshold = label_with_nonzero(256, 256, (0, 0, 256), 599);
        let counts = tiler
            .for_each_pair(&image, &below_threshold, |_| Ok(()))
            .unwrap();
        assert_eq!(counts.emitted, 0);
        assert_eq!(counts.discarded, 1);
    }

    #[test]
    fn test_sequence_numbers_are_consecutive_from_one() {
        let image = Array3::<f32>::zeros((512, 512, 3));
        let mut label = Array2::<i32>::zeros((512, 512));
        // make windows (0,1) and (1,1) informative, leave (0,0) and (1,0) empty
        for window in [(0, 1), (1, 1)] {
            let filled = label_with_nonzero(512, 512, (window.0, window.1, 256), 700);
            label.zip_mut_with(&filled, |a, &b| *a += b);
        }

        let tiler = Tiler::new();
        let pairs = tiler.extract(&image, &label).unwrap();

        let sequences: Vec<usize> = pairs.iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn test_scenario_four_candidates_one_survivor() {
        // 512x512x2 image, informative label content only in window (0,0)
        let image = Array3::<f32>::from_elem((512, 512, 2), 1.5);
        let label = label_with_nonzero(512, 512, (0, 0, 256), 700);

        let tiler = Tiler::new();
        let counts_probe = Tiler::with_params(TilerParams {
            stride: 256,
            policy: InformativePolicy::AbsoluteCount(0),
            edge_policy: EdgePolicy::Drop,
        })
        .for_each_pair(&image, &label, |_| Ok(()))
        .unwrap();
        assert_eq!(counts_probe.emitted, 4); // all candidates

        let pairs = tiler.extract(&image, &label).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].sequence, 1);
        assert_eq!(pairs[0].image.dim(), (256, 256, 2));
        assert_eq!(pairs[0].label.dim(), (256, 256));
    }

    #[test]
    fn test_nan_replaced_with_zero() {
        let mut image = Array3::<f32>::from_elem((256, 256, 1), 2.0);
        image[[0, 0, 0]] = f32::NAN;
        image[[10, 20, 0]] = f32::NAN;
        let label = Array2::<i32>::ones((256, 256));

        let pairs = Tiler::new().extract(&image, &label).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].image[[0, 0, 0]], 0.0);
        assert_eq!(pairs[0].image[[10, 20, 0]], 0.0);
        assert_eq!(pairs[0].image[[1, 1, 0]], 2.0);
    }

    #[test]
    fn test_extent_mismatch_is_error() {
        let image = Array3::<f32>::zeros((512, 512, 2));
        let label = Array2::<i32>::zeros((256, 256));

        let result = Tiler::new().extract(&image, &label);
        assert!(matches!(result, Err(TileError::ExtentMismatch { .. })));
    }

    #[test]
    fn test_zero_stride_is_error() {
        let image = Array3::<f32>::zeros((256, 256, 1));
        let label = Array2::<i32>::zeros((256, 256));

        let tiler = Tiler::with_params(TilerParams {
            stride: 0,
            policy: InformativePolicy::default(),
            edge_policy: EdgePolicy::Drop,
        });
        assert!(matches!(
            tiler.extract(&image, &label),
            Err(TileError::InvalidStride(0))
        ));
    }

    #[test]
    fn test_pad_to_stride_covers_edge_content() {
        // 300x300 raster, stride 256: Drop yields 1 candidate, PadToStride 4
        let image = Array3::<f32>::ones((300, 300, 1));
        let label = Array2::<i32>::ones((300, 300));
        let keep_all = InformativePolicy::AbsoluteCount(1);

        let dropped = Tiler::with_params(TilerParams {
            stride: 256,
            policy: keep_all,
            edge_policy: EdgePolicy::Drop,
        })
        .extract(&image, &label)
        .unwrap();
        assert_eq!(dropped.len(), 1);

        let padded = Tiler::with_params(TilerParams {
            stride: 256,
            policy: keep_all,
            edge_policy: EdgePolicy::PadToStride,
        })
        .extract(&image, &label)
        .unwrap();
        assert_eq!(padded.len(), 4);
        // padding carries no label signal
        let last = padded.last().unwrap();
        assert_eq!(last.label[[255, 255]], 0);
    }

    #[test]
    fn test_min_fraction_policy() {
        let policy = InformativePolicy::MinFraction(0.5);
        let mut tile = Array2::<i32>::zeros((4, 4));
        for i in 0..8 {
            tile[[i / 4, i % 4]] = 1;
        }
        assert!(policy.is_informative(&tile.view()));
        tile[[0, 0]] = 0;
        assert!(!policy.is_informative(&tile.view()));
    }
}
