use approx::assert_relative_eq;
use ndarray::{Array2, Array3};
use tempfile::TempDir;
use tileforge::{resample_nearest, DatasetSink, DatasetSource, Extent, Tiler};

/// Label raster with `count` nonzero pixels packed into the top-left
/// `rows x cols` corner
fn corner_label(extent: Extent, corner: (usize, usize), count: usize) -> Array2<i32> {
    let mut label = Array2::<i32>::zeros((extent.rows, extent.cols));
    let mut placed = 0;
    'outer: for r in 0..corner.0 {
        for c in 0..corner.1 {
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
fn test_scenario_a_resample_tile_persist() {
    let _ = env_logger::builder().is_test(true).try_init();

    // 512x512x2 image with a couple of NaN holes
    let mut image = Array3::<f32>::from_elem((512, 512, 2), 3.0);
    image[[0, 0, 0]] = f32::NAN;
    image[[100, 200, 1]] = f32::NAN;

    // 256x256 label; 175 nonzero pixels in the top-left 128x128 quadrant
    // become exactly 700 after 2x nearest-neighbor upsampling
    let label = corner_label(Extent::new(256, 256), (128, 128), 175);
    let label = resample_nearest(&label, Extent::new(512, 512));
    assert_eq!(label.iter().filter(|&&v| v != 0).count(), 700);

    let dest = TempDir::new().expect("Failed to create temp directory");
    let sink = DatasetSink::create(dest.path()).expect("Failed to create sink");

    let tiler = Tiler::new();
    let counts = tiler
        .for_each_pair(&image, &label, |pair| {
            sink.write("swat", 2015, &pair)?;
            Ok(())
        })
        .expect("Tiling failed");

    // 4 candidate windows, only (0,0) carries label signal
    assert_eq!(counts.emitted, 1);
    assert_eq!(counts.discarded, 3);

    let tile_path = dest.path().join("swat_2015_1.npz");
    assert!(tile_path.exists());

    let (tile_image, tile_label) = DatasetSource::read(&tile_path).expect("Failed to read pair");
    assert_eq!(tile_image.dim(), (256, 256, 2));
    assert_eq!(tile_label.dim(), (256, 256));

    // NaN holes were scrubbed to 0 before persistence
    assert_eq!(tile_image[[0, 0, 0]], 0.0);
    assert_eq!(tile_image[[100, 200, 1]], 0.0);
    assert_relative_eq!(tile_image[[1, 1, 0]], 3.0);

    assert_eq!(tile_label.iter().filter(|&&v| v != 0).count(), 700);
}

#[test]
fn test_rerun_produces_byte_identical_pairs() {
    let image = Array3::<f32>::from_elem((512, 512, 2), 1.0);
    let label = Array2::<i32>::ones((512, 512));

    let run = |dest: &std::path::Path| {
        let sink = DatasetSink::create(dest).unwrap();
        Tiler::new()
            .for_each_pair(&image, &label, |pair| {
                sink.write("buner", 2015, &pair)?;
                Ok(())
            })
            .unwrap()
    };

    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let counts_a = run(first.path());
    let counts_b = run(second.path());
    assert_eq!(counts_a, counts_b);
    assert_eq!(counts_a.emitted, 4);

    for sequence in 1..=4 {
        let name = format!("buner_2015_{}.npz", sequence);
        let bytes_a = std::fs::read(first.path().join(&name)).unwrap();
        let bytes_b = std::fs::read(second.path().join(&name)).unwrap();
        assert_eq!(bytes_a, bytes_b, "{} differs between runs", name);
    }
}

#[test]
fn test_sink_destination_created_idempotently() {
    let dest = TempDir::new().unwrap();
    let nested = dest.path().join("generated").join("data");

    let first = DatasetSink::create(&nested).unwrap();
    let second = DatasetSink::create(&nested).unwrap();
    assert_eq!(first.destination(), second.destination());
    assert!(nested.is_dir());
}
