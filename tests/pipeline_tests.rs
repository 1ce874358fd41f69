// tests/pipeline_tests.rs
use ndvi_pipeline::config::PipelineConfig;
use ndvi_pipeline::pipeline::BatchPipeline;
use std::fs;
use std::path::{Path, PathBuf};

fn temp_root(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!(
        "ndvi_pipeline_{}_{}",
        std::process::id(),
        name
    ));
    if root.exists() {
        fs::remove_dir_all(&root).unwrap();
    }
    fs::create_dir_all(&root).unwrap();
    root
}

fn touch(path: &Path) {
    fs::write(path, b"").unwrap();
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        workers: 2,
        ..PipelineConfig::default()
    }
}

/// Listing of a directory's file names, sorted, for before/after comparison
fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// A scene whose output file already exists is skipped, a scene missing one
/// band is counted as failed, and neither reaches the raster reader
#[test]
fn test_skip_existing_and_incomplete_scenes() {
    let input = temp_root("skip_input");
    let output = temp_root("skip_output");

    let scene_dir = input.join("2023-01-05");
    fs::create_dir_all(&scene_dir).unwrap();
    // red band only, the pair is incomplete
    touch(&scene_dir.join("scene_a_B4.TIF"));
    // complete pair, but its output is already present
    touch(&scene_dir.join("scene_b_B4.TIF"));
    touch(&scene_dir.join("scene_b_B5.TIF"));
    let out_dir = output.join("2023-01-05");
    fs::create_dir_all(&out_dir).unwrap();
    touch(&out_dir.join("scene_b.tif"));

    // stray file in the root is not a scene directory
    touch(&input.join("notes.txt"));

    let summary = BatchPipeline::new(test_config())
        .run(&input, &output)
        .unwrap();

    assert_eq!(summary.directories, 1);
    assert_eq!(summary.directories_failed, 0);
    assert_eq!(summary.scenes_written, 0);
    assert_eq!(summary.scenes_skipped, 1);
    assert_eq!(summary.scenes_failed, 1);
    assert!(out_dir.join("raster_index.csv").is_file());

    fs::remove_dir_all(&input).unwrap();
    fs::remove_dir_all(&output).unwrap();
}

/// Running the pipeline twice over the same tree changes nothing: every
/// scene is skipped again and the existing index file is left alone
#[test]
fn test_rerun_is_idempotent() {
    let input = temp_root("rerun_input");
    let output = temp_root("rerun_output");

    for dir in ["2023-01-05", "2023-02-06"] {
        let scene_dir = input.join(dir);
        fs::create_dir_all(&scene_dir).unwrap();
        touch(&scene_dir.join("scene_B4.TIF"));
        touch(&scene_dir.join("scene_B5.TIF"));
        let out_dir = output.join(dir);
        fs::create_dir_all(&out_dir).unwrap();
        touch(&out_dir.join("scene.tif"));
    }

    let first = BatchPipeline::new(test_config())
        .run(&input, &output)
        .unwrap();
    let listing_after_first = dir_listing(&output.join("2023-01-05"));
    let index_after_first =
        fs::read_to_string(output.join("2023-01-05").join("raster_index.csv")).unwrap();

    let second = BatchPipeline::new(test_config())
        .run(&input, &output)
        .unwrap();

    assert_eq!(first.directories, 2);
    assert_eq!(second.directories, 2);
    assert_eq!(second.scenes_written, first.scenes_written);
    assert_eq!(second.scenes_skipped, first.scenes_skipped);
    assert_eq!(dir_listing(&output.join("2023-01-05")), listing_after_first);
    let index_after_second =
        fs::read_to_string(output.join("2023-01-05").join("raster_index.csv")).unwrap();
    assert_eq!(index_after_second, index_after_first);

    fs::remove_dir_all(&input).unwrap();
    fs::remove_dir_all(&output).unwrap();
}

/// An empty scene directory is still mirrored and indexed, with nothing
/// counted as written or failed
#[test]
fn test_empty_scene_directory() {
    let input = temp_root("empty_input");
    let output = temp_root("empty_output");
    fs::create_dir_all(input.join("2023-03-07")).unwrap();

    let summary = BatchPipeline::new(test_config())
        .run(&input, &output)
        .unwrap();

    assert_eq!(summary.directories, 1);
    assert_eq!(summary.scenes_written, 0);
    assert_eq!(summary.scenes_failed, 0);
    assert!(output.join("2023-03-07").is_dir());
    assert!(output.join("2023-03-07").join("raster_index.csv").is_file());

    fs::remove_dir_all(&input).unwrap();
    fs::remove_dir_all(&output).unwrap();
}

/// An unusable output root is the one fatal filesystem error of a run
#[test]
fn test_unwritable_output_root_is_fatal() {
    let input = temp_root("fatal_input");
    fs::create_dir_all(input.join("2023-01-05")).unwrap();

    // a plain file where the output root should go
    let blocked = std::env::temp_dir().join(format!(
        "ndvi_pipeline_{}_blocked_root",
        std::process::id()
    ));
    touch(&blocked);

    let result = BatchPipeline::new(test_config()).run(&input, &blocked);
    assert!(result.is_err());

    fs::remove_file(&blocked).unwrap();
    fs::remove_dir_all(&input).unwrap();
}
