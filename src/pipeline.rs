// src/pipeline.rs
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::config::PipelineConfig;
use crate::index::{self, IndexRecord};
use crate::io::reader;
use crate::io::writer;
use crate::processing::{ndvi, normalize};

/// Counters reported after a batch run.
#[derive(Debug, Default, Clone)]
pub struct BatchSummary {
    pub directories: usize,
    pub directories_failed: usize,
    pub scenes_written: usize,
    pub scenes_skipped: usize,
    pub scenes_failed: usize,
}

#[derive(Default)]
struct DirectoryOutcome {
    written: usize,
    skipped: usize,
    failed: usize,
}

/// Red and near-infrared source files of one scene prefix.
struct ScenePair {
    red: Option<PathBuf>,
    nir: Option<PathBuf>,
}

/// Walks a root of dated scene directories and derives one normalized NDVI
/// raster per scene, mirrored under the output root, with a per-directory
/// raster index.
///
/// The directory queue is seeded once and consumed by a fixed pool of
/// workers; each directory is claimed by exactly one worker and directories
/// never share output paths, so workers coordinate only through the queue.
/// Reruns are cheap: scenes whose output file exists and directories whose
/// index file exists are skipped.
pub struct BatchPipeline {
    config: PipelineConfig,
}

impl BatchPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, input_root: &Path, output_root: &Path) -> Result<BatchSummary> {
        // The one fatal filesystem precondition of the whole run.
        fs::create_dir_all(output_root)
            .with_context(|| format!("cannot create output root {}", output_root.display()))?;

        let directories: Vec<String> = fs::read_dir(input_root)
            .with_context(|| format!("cannot list input root {}", input_root.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .sorted()
            .collect();

        let (tx, rx) = flume::unbounded::<String>();
        for dir in &directories {
            debug!("queued directory {dir}");
            tx.send(dir.clone()).expect("queue receiver alive");
        }
        drop(tx);
        info!("queued {} directories", directories.len());

        let workers = self.config.workers.max(1);
        let summary = Arc::new(Mutex::new(BatchSummary::default()));
        let config = Arc::new(self.config.clone());
        let input_root = input_root.to_path_buf();
        let output_root = output_root.to_path_buf();

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = rx.clone();
            let config = Arc::clone(&config);
            let summary = Arc::clone(&summary);
            let input_root = input_root.clone();
            let output_root = output_root.clone();

            handles.push(thread::spawn(move || {
                for dir in rx.iter() {
                    let result = process_directory(&config, &input_root, &output_root, &dir);
                    let mut summary = summary.lock();
                    summary.directories += 1;
                    match result {
                        Ok(outcome) => {
                            summary.scenes_written += outcome.written;
                            summary.scenes_skipped += outcome.skipped;
                            summary.scenes_failed += outcome.failed;
                        }
                        Err(e) => {
                            // Logged and marked done; other directories are
                            // unaffected and there is no retry.
                            error!("error processing directory {dir}: {e:#}");
                            summary.directories_failed += 1;
                        }
                    }
                }
            }));
        }

        let mut panics = Vec::new();
        for handle in handles {
            if let Err(e) = handle.join() {
                panics.push(e);
            }
        }
        if !panics.is_empty() {
            panic::resume_unwind(Box::new(panics));
        }

        let summary = summary.lock().clone();
        info!(
            "batch complete: {} directories ({} failed), {} scenes written, {} skipped, {} failed",
            summary.directories,
            summary.directories_failed,
            summary.scenes_written,
            summary.scenes_skipped,
            summary.scenes_failed
        );
        Ok(summary)
    }
}

fn process_directory(
    config: &PipelineConfig,
    input_root: &Path,
    output_root: &Path,
    dir: &str,
) -> Result<DirectoryOutcome> {
    let input_dir = input_root.join(dir);
    let output_dir = output_root.join(dir);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("cannot create {}", output_dir.display()))?;

    let completed = completed_scenes(&output_dir)?;
    let scenes = discover_scenes(&input_dir, config)?;

    let mut outcome = DirectoryOutcome::default();
    let mut records: Vec<IndexRecord> = Vec::new();

    for (scene, pair) in scenes {
        if completed.contains(&scene) {
            debug!("scene {scene} already exists");
            outcome.skipped += 1;
            continue;
        }

        let (Some(red), Some(nir)) = (pair.red, pair.nir) else {
            warn!("scene {scene} is missing one band, skipped");
            outcome.failed += 1;
            continue;
        };

        match process_scene(config, &scene, &red, &nir, &output_dir) {
            Ok(record) => {
                info!("scene {scene} written");
                if let Some(record) = record {
                    records.push(record);
                }
                outcome.written += 1;
            }
            Err(e) => {
                error!("skipping scene {scene}: {e:#}");
                outcome.failed += 1;
            }
        }
    }

    let index_path = output_dir.join(&config.index_file_name);
    if index_path.is_file() {
        debug!("index {} already exists", index_path.display());
    } else {
        index::write_index(&index_path, &records)?;
    }

    Ok(outcome)
}

/// Derives and exports one scene. Returns the index record, or None when the
/// raster was written but its bounding rectangle could not be derived.
fn process_scene(
    config: &PipelineConfig,
    scene: &str,
    red: &Path,
    nir: &Path,
    output_dir: &Path,
) -> Result<Option<IndexRecord>> {
    let bands = reader::read_scene_bands(red, nir, config.reflectance_scale)?;

    let ndvi = ndvi::calculate_ndvi(&bands.red, &bands.nir);
    let (normalized, range) = normalize::normalize_ndvi(&ndvi);

    let output_path = output_dir.join(format!("{scene}.tif"));
    writer::write_ndvi_raster(
        &normalized,
        &bands.geo,
        &range,
        &output_path,
        config.clamped_quality(),
    )?;

    match index::scene_mbr(&bands.geo) {
        Ok(mbr) => Ok(Some(IndexRecord::new(scene.to_string(), &mbr))),
        Err(e) => {
            warn!("no index entry for {scene}: {e:#}");
            Ok(None)
        }
    }
}

/// Base names already present in the output directory.
fn completed_scenes(output_dir: &Path) -> Result<HashSet<String>> {
    let mut completed = HashSet::new();
    for entry in fs::read_dir(output_dir)
        .with_context(|| format!("cannot list {}", output_dir.display()))?
    {
        let path = entry?.path();
        if let Some(stem) = path.file_stem() {
            completed.insert(stem.to_string_lossy().into_owned());
        }
    }
    Ok(completed)
}

/// Groups a directory's TIFF band files into scenes by stripping the
/// configured band suffixes from the file stem. Sorted for deterministic
/// processing order within a directory.
fn discover_scenes(
    input_dir: &Path,
    config: &PipelineConfig,
) -> Result<BTreeMap<String, ScenePair>> {
    let mut scenes: BTreeMap<String, ScenePair> = BTreeMap::new();

    for entry in fs::read_dir(input_dir)
        .with_context(|| format!("cannot list {}", input_dir.display()))?
    {
        let path = entry?.path();
        let is_tif = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("tif"))
            .unwrap_or(false);
        if !is_tif {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };

        if let Some(scene) = stem.strip_suffix(&config.red_suffix) {
            scenes
                .entry(scene.to_string())
                .or_insert_with(|| ScenePair { red: None, nir: None })
                .red = Some(path);
        } else if let Some(scene) = stem.strip_suffix(&config.nir_suffix) {
            scenes
                .entry(scene.to_string())
                .or_insert_with(|| ScenePair { red: None, nir: None })
                .nir = Some(path);
        }
    }

    Ok(scenes)
}
