use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, Rgb, RgbImage};
use visual_complexity::core_modules::utils::image_helper::load_record;
use visual_complexity::parallel_pipeline::{BatchConfig, BatchDriver, expand_inputs};
use visual_complexity::{ComplexityAnalyzer, Error};

fn write_checkerboard(path: &Path, width: u32, height: u32) {
    let image = RgbImage::from_fn(width, height, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb([240, 240, 60])
        } else {
            Rgb([20, 20, 200])
        }
    });
    image.save(path).unwrap();
}

fn write_flat_gray(path: &Path, width: u32, height: u32, value: u8) {
    GrayImage::from_pixel(width, height, Luma([value])).save(path).unwrap();
}

fn config(output_dir: &Path, skip_existing: bool) -> BatchConfig {
    BatchConfig {
        output_dir: output_dir.to_path_buf(),
        workers: 2,
        skip_existing,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_writes_one_record_per_image_and_skips_failures() {
    let raw = tempfile::tempdir().unwrap();
    let processed = tempfile::tempdir().unwrap();

    write_checkerboard(&raw.path().join("board.png"), 64, 48);
    write_flat_gray(&raw.path().join("flat.png"), 20, 10, 90);
    std::fs::write(raw.path().join("broken.jpg"), b"not an image").unwrap();

    let images = expand_inputs(&[raw.path().to_path_buf()]).unwrap();
    assert_eq!(images.len(), 3);

    let driver = BatchDriver::new(
        ComplexityAnalyzer::default(),
        config(processed.path(), false),
    );
    let summary = driver.run(images).await;
    driver.shutdown().await;

    assert_eq!(summary.written.len(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].image, raw.path().join("broken.jpg"));
    assert!(summary.failures[0].reason.contains("broken.jpg"));

    let board = load_record(&processed.path().join("board_metrics.json")).unwrap();
    assert_eq!(board.filename, "board.png");
    assert_eq!(board.image_size, (64, 48));
    assert!(board.edge_count > 0);
    assert!(board.color_entropy > 0.0);

    let flat = load_record(&processed.path().join("flat_metrics.json")).unwrap();
    assert_eq!(flat.image_size, (20, 10));
    assert_eq!(flat.entropy, 0.0);
    assert_eq!(flat.color_entropy, flat.entropy);
    assert_eq!(flat.edge_count, 0);
    assert_eq!(flat.color_variance, 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn existing_records_can_be_kept() {
    let raw = tempfile::tempdir().unwrap();
    let processed = tempfile::tempdir().unwrap();
    let image = raw.path().join("flat.png");
    write_flat_gray(&image, 8, 8, 10);

    let record = processed.path().join("flat_metrics.json");
    std::fs::write(&record, b"{}").unwrap();

    let driver = BatchDriver::new(
        ComplexityAnalyzer::default(),
        config(processed.path(), true),
    );
    let summary = driver.run(vec![image.clone()]).await;
    driver.shutdown().await;
    assert_eq!(summary.skipped, vec![record.clone()]);
    assert!(summary.written.is_empty());
    assert_eq!(std::fs::read_to_string(&record).unwrap(), "{}");

    // Without the flag the stale record is overwritten.
    let driver = BatchDriver::new(
        ComplexityAnalyzer::default(),
        config(processed.path(), false),
    );
    let summary = driver.run(vec![image]).await;
    driver.shutdown().await;
    assert_eq!(summary.written, vec![record.clone()]);
    assert_eq!(load_record(&record).unwrap().filename, "flat.png");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_files_are_reported_not_fatal() {
    let processed = tempfile::tempdir().unwrap();
    let raw = tempfile::tempdir().unwrap();
    let present = raw.path().join("present.png");
    write_flat_gray(&present, 4, 4, 200);

    let images: Vec<PathBuf> = vec![raw.path().join("missing.png"), present];
    let driver = BatchDriver::new(
        ComplexityAnalyzer::default(),
        config(processed.path(), false),
    );
    let summary = driver.run(images).await;
    driver.shutdown().await;

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.written, vec![processed.path().join("present_metrics.json")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn images_sharing_a_stem_keep_separate_records() {
    let raw = tempfile::tempdir().unwrap();
    let processed = tempfile::tempdir().unwrap();

    write_flat_gray(&raw.path().join("photo.png"), 16, 16, 128);
    let split = RgbImage::from_fn(16, 16, |x, _| {
        if x < 8 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    split.save(raw.path().join("photo.bmp")).unwrap();

    let images = expand_inputs(&[raw.path().to_path_buf()]).unwrap();
    let driver = BatchDriver::new(
        ComplexityAnalyzer::default(),
        config(processed.path(), false),
    );
    let summary = driver.run(images).await;
    driver.shutdown().await;

    assert!(summary.failures.is_empty());
    let bmp_record = processed.path().join("photo.bmp_metrics.json");
    let png_record = processed.path().join("photo.png_metrics.json");
    assert_eq!(summary.written, vec![bmp_record.clone(), png_record.clone()]);

    let mut on_disk: Vec<_> = std::fs::read_dir(processed.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    on_disk.sort();
    assert_eq!(on_disk, vec!["photo.bmp_metrics.json", "photo.png_metrics.json"]);

    let flat = load_record(&png_record).unwrap();
    assert_eq!(flat.filename, "photo.png");
    assert_eq!(flat.entropy, 0.0);

    let split = load_record(&bmp_record).unwrap();
    assert_eq!(split.filename, "photo.bmp");
    assert_eq!(split.entropy, 1.0);
}

#[test]
fn missing_input_directories_are_rejected_up_front() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("data/raw");
    let err = expand_inputs(&[raw.clone()]).unwrap_err();
    assert!(matches!(err, Error::InputNotFound(ref path) if *path == raw));
}
