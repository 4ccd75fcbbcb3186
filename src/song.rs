//! A song and its emotion predictions
//!
//! Construction loads and validates the audio and fixes the compute device.
//! Analysis runs segmentation, feature extraction, batching and the model,
//! and caches the per-segment predictions on the song. Re-analysing
//! recomputes and overwrites the cache; nothing invalidates it implicitly.

use crate::audio::{self, AudioSource};
use crate::error::{Result, SongSorterError};
use crate::features::{BatchAssembler, FeatureBatch, FeatureExtractor, Segmenter};
use crate::inference::{default_model_format, find_model_path, Device, DeviceSelector, ModelRunner};
use crate::types::{AnalyzedSong, AudioBuffer, EmotionPoint, Mood, SegmentEmotion};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Whether predictions have been computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongState {
    Unanalyzed,
    Analyzed,
}

#[derive(Debug, Clone)]
pub struct Song {
    title: String,
    path: Option<PathBuf>,
    audio: AudioBuffer,
    device: Device,
    emotions: Option<Vec<EmotionPoint>>,
}

impl Song {
    /// Load a song, selecting the best available device
    pub fn new(source: impl Into<AudioSource>) -> Result<Self> {
        Self::with_selector(source, &DeviceSelector::default())
    }

    /// Load a song with a device chosen by `selector`
    ///
    /// The device must be able to run the installed weights, so native
    /// safetensors weights always get the CPU.
    pub fn with_selector(source: impl Into<AudioSource>, selector: &DeviceSelector) -> Result<Self> {
        let source = source.into();
        // Validate audio before probing devices
        let (path, audio) = Self::load_source(source)?;
        let device = selector.select_for(default_model_format());
        Ok(Self::assemble(path, audio, device))
    }

    /// Load a song pinned to `device`
    pub fn with_device(source: impl Into<AudioSource>, device: Device) -> Result<Self> {
        let (path, audio) = Self::load_source(source.into())?;
        Ok(Self::assemble(path, audio, device))
    }

    /// Decode an audio file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(AudioSource::path(path.as_ref()))
    }

    /// Wrap mono samples; `sample_rate` must be 44100
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(AudioSource::buffer(samples, sample_rate))
    }

    fn load_source(source: AudioSource) -> Result<(Option<PathBuf>, AudioBuffer)> {
        let path = match &source {
            AudioSource::Path(p) => Some(p.clone()),
            AudioSource::Buffer { .. } => None,
        };
        let audio = audio::load(source)?;
        Ok((path, audio))
    }

    fn assemble(path: Option<PathBuf>, audio: AudioBuffer, device: Device) -> Self {
        let title = match &path {
            Some(p) => audio::extract_title(p),
            None => "Untitled".to_string(),
        };
        debug!("Song '{}' ready on {} ({:.2}s)", title, device, audio.duration);
        Self {
            title,
            path,
            audio,
            device,
            emotions: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn audio(&self) -> &AudioBuffer {
        &self.audio
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn duration(&self) -> f64 {
        self.audio.duration
    }

    /// Number of 0.5s segments the waveform yields
    pub fn segment_count(&self) -> usize {
        Segmenter::default().segment_count(self.audio.len())
    }

    pub fn state(&self) -> SongState {
        if self.emotions.is_some() {
            SongState::Analyzed
        } else {
            SongState::Unanalyzed
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.state() == SongState::Analyzed
    }

    /// Cached predictions, one per segment in chronological order
    pub fn emotions(&self) -> Option<&[EmotionPoint]> {
        self.emotions.as_deref()
    }

    /// Cached predictions paired with their segment start times
    pub fn segment_emotions(&self) -> Vec<SegmentEmotion> {
        let Some(emotions) = self.emotions.as_deref() else {
            return Vec::new();
        };
        let segmenter = Segmenter::default();
        let remainder = segmenter.remainder(self.audio.len());
        let sr = self.audio.sample_rate as f64;

        emotions
            .iter()
            .enumerate()
            .map(|(index, &emotion)| SegmentEmotion {
                index,
                start_seconds: (remainder + index * segmenter.segment_samples()) as f64 / sr,
                emotion,
            })
            .collect()
    }

    /// `(segments, 44, 128)` log-mel batch for this song
    pub fn features(&self, extractor: &FeatureExtractor) -> Result<FeatureBatch> {
        let segments = Segmenter::default().segment(&self.audio.samples)?;
        let features = extractor.extract_segments(&segments)?;
        BatchAssembler::default().assemble(&features)
    }

    /// Predict with a shared extractor and runner, overwriting any cache
    pub fn analyze_with(
        &mut self,
        extractor: &FeatureExtractor,
        runner: &ModelRunner,
    ) -> Result<&[EmotionPoint]> {
        if runner.device() != self.device {
            return Err(SongSorterError::DeviceMismatch {
                song: self.device,
                model: runner.device(),
            });
        }

        let batch = self.features(extractor)?;
        let points = runner.run(&batch)?;
        info!("'{}': {} segment predictions", self.title, points.len());

        Ok(self.emotions.insert(points).as_slice())
    }

    /// Load the default model for this song's device and predict
    pub fn get_emotions(&mut self) -> Result<&[EmotionPoint]> {
        let model_path = find_model_path(None)?;
        let runner = ModelRunner::load(self.device, Some(&model_path))?;
        self.analyze_with(&FeatureExtractor::new(), &runner)
    }

    pub fn average_arousal(&self) -> Option<f32> {
        self.average_emotion().map(|p| p.arousal)
    }

    pub fn average_valence(&self) -> Option<f32> {
        self.average_emotion().map(|p| p.valence)
    }

    /// Mean prediction, `None` until analysed
    pub fn average_emotion(&self) -> Option<EmotionPoint> {
        self.emotions.as_deref().and_then(EmotionPoint::mean)
    }

    pub fn mood(&self) -> Option<Mood> {
        self.average_emotion().map(|p| p.mood())
    }

    /// Distance between the two songs' average emotions
    pub fn distance(&self, other: &Song) -> Option<f32> {
        Some(self.average_emotion()?.distance(&other.average_emotion()?))
    }

    /// Snapshot for reporting and export
    pub fn to_analyzed(&self) -> AnalyzedSong {
        let average = self.average_emotion();
        AnalyzedSong {
            path: self.path.clone(),
            title: self.title.clone(),
            duration_seconds: self.audio.duration,
            device: self.device,
            segments: self.segment_emotions(),
            average,
            mood: average.map(|p| p.mood()),
            analyzed_at: chrono::Utc::now(),
        }
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.average_emotion() {
            Some(avg) => write!(f, "{} {}", self.title, avg),
            None => f.write_str(&self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FRAMES_PER_SEGMENT, N_MELS, SEGMENT_SAMPLES};
    use crate::inference::{EmotionModel, WeightFormat};

    /// Mean feature energy per segment as arousal, segment count as valence
    struct EnergyModel;

    impl EmotionModel for EnergyModel {
        fn predict(&self, batch: &FeatureBatch) -> Result<Vec<EmotionPoint>> {
            let n = batch.dim().0;
            Ok(batch
                .outer_iter()
                .map(|m| EmotionPoint::new(m.mean().unwrap_or(0.0), n as f32))
                .collect())
        }

        fn device(&self) -> Device {
            Device::Cpu
        }

        fn name(&self) -> &'static str {
            "energy"
        }
    }

    fn tone(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_new_song_is_unanalyzed() {
        let song = Song::with_device(AudioSource::buffer(tone(44100), 44100), Device::Cpu).unwrap();
        assert_eq!(song.state(), SongState::Unanalyzed);
        assert!(song.emotions().is_none());
        assert!(song.average_emotion().is_none());
        assert!(song.segment_emotions().is_empty());
        assert_eq!(song.title(), "Untitled");
        assert_eq!(song.segment_count(), 2);
    }

    #[test]
    fn test_wrong_sample_rate_rejected() {
        let err = Song::from_samples(tone(44100), 22050).unwrap_err();
        assert!(matches!(err, SongSorterError::SamplingRate { actual: 22050, .. }));
    }

    #[test]
    fn test_too_short_rejected_at_construction() {
        let err = Song::from_samples(tone(SEGMENT_SAMPLES - 1), 44100).unwrap_err();
        assert!(matches!(err, SongSorterError::AudioTooShort { .. }));
    }

    #[test]
    fn test_features_shape() {
        let song = Song::with_device(AudioSource::buffer(tone(132300), 44100), Device::Cpu).unwrap();
        let batch = song.features(&FeatureExtractor::new()).unwrap();
        assert_eq!(batch.dim(), (6, FRAMES_PER_SEGMENT, N_MELS));
    }

    #[test]
    fn test_batch_rows_match_their_segments() {
        use ndarray::Axis;

        // Rising chirp with a growing envelope: no two segments look alike
        let len = SEGMENT_SAMPLES * 4 + 1000;
        let samples: Vec<f32> = (0..len)
            .map(|i| {
                let t = i as f32 / 44100.0;
                let progress = i as f32 / len as f32;
                (0.05 + 0.5 * progress) * (2.0 * std::f32::consts::PI * (200.0 + 900.0 * t) * t).sin()
            })
            .collect();
        let song = Song::with_device(AudioSource::buffer(samples, 44100), Device::Cpu).unwrap();

        let extractor = FeatureExtractor::new();
        let batch = song.features(&extractor).unwrap();
        let segments = Segmenter::default().segment(&song.audio().samples).unwrap();
        assert_eq!(batch.dim().0, segments.len());
        assert_eq!(segments[0].start_sample, 1000);

        for (i, segment) in segments.iter().enumerate() {
            let expected = extractor.extract(segment.samples).unwrap();
            assert_eq!(batch.index_axis(Axis(0), i), expected.view(), "segment {}", i);
        }

        // Rows are distinct, so a reordering would have been caught
        for i in 1..segments.len() {
            assert_ne!(batch.index_axis(Axis(0), i - 1), batch.index_axis(Axis(0), i));
        }
    }

    #[test]
    fn test_selector_respects_native_weights() {
        // Without onnx support only native weights can be installed
        if WeightFormat::supported() == [WeightFormat::SafeTensors] {
            let selector = DeviceSelector::with_probe(|_| true);
            let song = Song::with_selector(AudioSource::buffer(tone(44100), 44100), &selector).unwrap();
            assert_eq!(song.device(), Device::Cpu);
        }
    }

    #[test]
    fn test_analyze_caches_and_overwrites() {
        let mut song = Song::with_device(AudioSource::buffer(tone(132300), 44100), Device::Cpu).unwrap();
        let extractor = FeatureExtractor::new();
        let runner = ModelRunner::with_model(EnergyModel);

        let first = song.analyze_with(&extractor, &runner).unwrap().to_vec();
        assert_eq!(first.len(), 6);
        assert!(song.is_analyzed());

        let second = song.analyze_with(&extractor, &runner).unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(song.emotions().unwrap(), second.as_slice());
    }

    #[test]
    fn test_segment_start_times_skip_remainder() {
        let len = SEGMENT_SAMPLES * 2 + 441;
        let mut song = Song::with_device(AudioSource::buffer(tone(len), 44100), Device::Cpu).unwrap();
        song.analyze_with(&FeatureExtractor::new(), &ModelRunner::with_model(EnergyModel))
            .unwrap();

        let segments = song.segment_emotions();
        assert_eq!(segments.len(), 2);
        assert!((segments[0].start_seconds - 0.01).abs() < 1e-9);
        assert!((segments[1].start_seconds - 0.51).abs() < 1e-9);
    }

    #[test]
    fn test_device_mismatch_rejected() {
        let mut song = Song::with_device(AudioSource::buffer(tone(44100), 44100), Device::Cuda).unwrap();
        let err = song
            .analyze_with(&FeatureExtractor::new(), &ModelRunner::with_model(EnergyModel))
            .unwrap_err();
        assert!(matches!(
            err,
            SongSorterError::DeviceMismatch {
                song: Device::Cuda,
                model: Device::Cpu
            }
        ));
        assert!(!song.is_analyzed());
    }

    #[test]
    fn test_averages_mood_and_distance() {
        let extractor = FeatureExtractor::new();
        let runner = ModelRunner::with_model(EnergyModel);

        let mut loud = Song::with_device(AudioSource::buffer(tone(44100), 44100), Device::Cpu).unwrap();
        let mut silent =
            Song::with_device(AudioSource::buffer(vec![0.0; 44100], 44100), Device::Cpu).unwrap();
        assert!(loud.distance(&silent).is_none());

        loud.analyze_with(&extractor, &runner).unwrap();
        silent.analyze_with(&extractor, &runner).unwrap();

        assert_eq!(silent.average_arousal(), Some(0.0));
        assert_eq!(silent.average_valence(), Some(2.0));
        assert!(loud.average_arousal().unwrap() > 0.0);
        assert!(loud.mood().is_some());

        let d = loud.distance(&silent).unwrap();
        assert!((d - loud.average_arousal().unwrap()).abs() < 1e-5);

        let analyzed = loud.to_analyzed();
        assert_eq!(analyzed.segments.len(), 2);
        assert_eq!(analyzed.mood, loud.mood());
        assert!(analyzed.path.is_none());
    }
}
