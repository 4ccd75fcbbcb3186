//! Pipeline orchestration
//!
//! Coordinates file discovery, model loading, parallel analysis, ordering
//! and export. The model is loaded once and shared by every worker.

use crate::config::Settings;
use crate::discovery::{self, DiscoveredFile};
use crate::error::{Result, SongSorterError};
use crate::export;
use crate::features::FeatureExtractor;
use crate::inference::{find_model_path, Device, DeviceSelector, ModelRunner, WeightFormat};
use crate::playlist::nearest_neighbour_order;
use crate::song::Song;
use crate::types::{AnalyzedSong, EmotionPoint};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Pipeline result summary
#[derive(Debug)]
pub struct PipelineResult {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Analyzed songs in discovery order
    pub songs: Vec<AnalyzedSong>,
    /// Nearest-neighbour order over `songs`, when sorting was requested
    pub order: Option<Vec<usize>>,
}

impl PipelineResult {
    fn empty(total_files: usize, skipped: usize) -> Self {
        Self {
            total_files,
            successful: 0,
            failed: 0,
            skipped,
            songs: Vec::new(),
            order: None,
        }
    }

    /// Songs in output order: sorted if an order was computed
    pub fn ordered_songs(&self) -> Vec<&AnalyzedSong> {
        match &self.order {
            Some(order) => order.iter().filter_map(|&i| self.songs.get(i)).collect(),
            None => self.songs.iter().collect(),
        }
    }
}

/// Run the full analysis pipeline
pub fn run(settings: &Settings) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    configure_thread_pool(settings.analysis_threads)?;

    // Phase 1: Discovery
    info!("Scanning for audio files...");
    let (files, scan_errors) = discovery::scan_all(&settings.inputs, settings.recursive);
    let total_files = files.len() + scan_errors.len();

    if files.is_empty() {
        return Ok(PipelineResult::empty(total_files, scan_errors.len()));
    }

    // Phase 2: Model. Any failure here aborts the batch.
    let model_path = find_model_path(settings.model_path.as_deref())?;
    let device = select_device(settings, WeightFormat::from_path(&model_path));
    info!("Using {} for inference", device);
    let runner = ModelRunner::load(device, Some(&model_path))?;
    let extractor = FeatureExtractor::new();

    // Phase 3: Analysis
    info!("Analyzing {} files", files.len());
    let analysis_start = Instant::now();
    let (songs, stats) = analyze_files(&files, device, &extractor, &runner, settings)?;
    info!(
        "Analysis completed in {:.2}s",
        analysis_start.elapsed().as_secs_f64()
    );

    // Phase 4: Ordering
    let order = if settings.sort {
        let points: Vec<EmotionPoint> = songs
            .iter()
            .map(|s| s.average.unwrap_or_default())
            .collect();
        Some(nearest_neighbour_order(&points))
    } else {
        None
    };

    let result = PipelineResult {
        total_files,
        successful: stats.successful,
        failed: stats.failed,
        skipped: stats.skipped + scan_errors.len(),
        songs,
        order,
    };

    // Phase 5: Export
    if let Some(json_path) = &settings.json_output {
        if !result.songs.is_empty() {
            let ordered: Vec<AnalyzedSong> = result.ordered_songs().into_iter().cloned().collect();
            export::write_json(&ordered, json_path)?;
        }
    }

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(result)
}

/// Pick the device once for the whole batch
///
/// The native backend only runs on the CPU; ONNX models get the best
/// available execution provider unless the CPU is forced.
fn select_device(settings: &Settings, format: WeightFormat) -> Device {
    if settings.force_cpu {
        Device::Cpu
    } else {
        DeviceSelector::new().select_for(format)
    }
}

/// Configure the Rayon thread pool
fn configure_thread_pool(num_threads: usize) -> Result<()> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(()) => {
            debug!("Configured thread pool with {} threads", num_threads);
        }
        Err(e) => {
            // If the pool is already initialized (e.g., in tests), that's OK
            if e.to_string().contains("already been initialized") {
                debug!("Thread pool already initialized, using existing pool");
            } else {
                return Err(SongSorterError::ConfigError(format!(
                    "Failed to configure thread pool: {}",
                    e
                )));
            }
        }
    }
    Ok(())
}

/// Analysis statistics
struct AnalysisStats {
    successful: usize,
    failed: usize,
    skipped: usize,
}

/// Analyze files in parallel, preserving discovery order
fn analyze_files(
    files: &[DiscoveredFile],
    device: Device,
    extractor: &FeatureExtractor,
    runner: &ModelRunner,
    settings: &Settings,
) -> Result<(Vec<AnalyzedSong>, AnalysisStats)> {
    let progress_bar = if settings.show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);

    let outcomes: Vec<Result<AnalyzedSong>> = files
        .par_iter()
        .map(|file| {
            let result = analyze_single_file(file, device, extractor, runner);

            match &result {
                Ok(_) => {
                    successful.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping {}: {}", file.path.display(), e);
                    skipped.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) if e.is_model_error() => {
                    error!("Model failure on {}: {}", file.path.display(), e);
                }
                Err(e) => {
                    error!("Failed {}: {}", file.path.display(), e);
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
                pb.set_message(format!(
                    "{}",
                    file.path.file_name().unwrap_or_default().to_string_lossy()
                ));
            }
            result
        })
        .collect();

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Analysis complete");
    }

    let mut songs = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(song) => songs.push(song),
            Err(e) if e.is_model_error() => return Err(e),
            Err(_) => {}
        }
    }

    let stats = AnalysisStats {
        successful: successful.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        skipped: skipped.load(Ordering::Relaxed),
    };

    Ok((songs, stats))
}

/// Analyze a single file
///
/// The decoded audio is dropped once predictions are taken, so memory stays
/// bounded by the number of workers rather than the number of files.
fn analyze_single_file(
    file: &DiscoveredFile,
    device: Device,
    extractor: &FeatureExtractor,
    runner: &ModelRunner,
) -> Result<AnalyzedSong> {
    debug!("Analyzing: {}", file.path.display());

    let mut song = Song::with_device(file.path.as_path(), device)?;
    song.analyze_with(extractor, runner)?;

    let analyzed = song.to_analyzed();
    debug!(
        "Analyzed {}: {} segments, mood {}",
        file.path.file_name().unwrap_or_default().to_string_lossy(),
        analyzed.segments.len(),
        analyzed.mood.map(|m| m.as_str()).unwrap_or("-")
    );

    Ok(analyzed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_native_weights_force_cpu() {
        let settings = Settings::default();
        assert_eq!(select_device(&settings, WeightFormat::SafeTensors), Device::Cpu);

        let settings = Settings {
            force_cpu: true,
            ..Settings::default()
        };
        assert_eq!(select_device(&settings, WeightFormat::Onnx), Device::Cpu);
    }

    #[test]
    fn test_empty_input_returns_empty_result() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings {
            inputs: vec![dir.path().to_path_buf()],
            show_progress: false,
            ..Settings::default()
        };
        let result = run(&settings).unwrap();
        assert_eq!(result.total_files, 0);
        assert!(result.songs.is_empty());
    }

    #[test]
    fn test_missing_inputs_are_skipped() {
        let settings = Settings {
            inputs: vec![PathBuf::from("/nonexistent/song.mp3")],
            show_progress: false,
            ..Settings::default()
        };
        let result = run(&settings).unwrap();
        assert_eq!(result.total_files, 1);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_ordered_songs_follow_order() {
        let song = |title: &str| AnalyzedSong {
            path: None,
            title: title.to_string(),
            duration_seconds: 1.0,
            device: Device::Cpu,
            segments: Vec::new(),
            average: None,
            mood: None,
            analyzed_at: chrono::Utc::now(),
        };
        let result = PipelineResult {
            total_files: 2,
            successful: 2,
            failed: 0,
            skipped: 0,
            songs: vec![song("a"), song("b")],
            order: Some(vec![1, 0]),
        };
        let titles: Vec<_> = result.ordered_songs().iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a"]);
    }
}
