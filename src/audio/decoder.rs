//! Audio decoding using symphonia
//!
//! Decodes audio files to mono f32 samples at the model's sample rate.
//! Uses rubato for high-quality resampling with proper anti-aliasing.

use crate::error::{Result, SongSorterError};
use crate::types::AudioBuffer;
use rubato::{FftFixedInOut, Resampler};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Sample rate the emotion model was trained on (44100 Hz)
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Maximum file size we'll attempt to decode (2GB)
/// Prevents OOM on extremely large files
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Decode an audio file to a mono AudioBuffer at [`TARGET_SAMPLE_RATE`]
pub fn decode(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(SongSorterError::FileNotFound(path.to_path_buf()));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| SongSorterError::decode_error(path, format!("Failed to read file metadata: {}", e)))?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(SongSorterError::decode_error(
            path,
            format!(
                "File too large ({:.1} GB). Maximum supported size is 2 GB.",
                metadata.len() as f64 / (1024.0 * 1024.0 * 1024.0)
            ),
        ));
    }

    let file = std::fs::File::open(path)
        .map_err(|e| SongSorterError::decode_error(path, format!("Failed to open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Provide a hint based on file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| SongSorterError::decode_error(path, format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| SongSorterError::decode_error(path, "No audio tracks found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let source_sample_rate = codec_params.sample_rate.unwrap_or(TARGET_SAMPLE_RATE);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    debug!(
        "Decoding: {} @ {}Hz, {} channels",
        path.display(),
        source_sample_rate,
        channels
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| SongSorterError::decode_error(path, format!("Failed to create decoder: {}", e)))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(e) => {
                return Err(SongSorterError::decode_error(
                    path,
                    format!("Failed to read packet: {}", e),
                ));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(SongSorterError::decode_error(path, format!("Decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        // Packets carry their own channel count; trust it over the codec params
        let packet_channels = spec.channels.count().max(1);
        all_samples.extend(to_mono(sample_buf.samples(), packet_channels));
    }

    if all_samples.is_empty() {
        return Err(SongSorterError::decode_error(path, "File contains no audio samples"));
    }

    let final_samples = if source_sample_rate != TARGET_SAMPLE_RATE {
        debug!(
            "Resampling {} from {}Hz to {}Hz",
            path.display(),
            source_sample_rate,
            TARGET_SAMPLE_RATE
        );
        resample(&all_samples, source_sample_rate, TARGET_SAMPLE_RATE)
            .map_err(|reason| SongSorterError::decode_error(path, reason))?
    } else {
        all_samples
    };

    debug!(
        "Decoded {} samples ({:.2}s)",
        final_samples.len(),
        final_samples.len() as f64 / TARGET_SAMPLE_RATE as f64
    );

    Ok(AudioBuffer::new(final_samples, TARGET_SAMPLE_RATE))
}

/// Convert interleaved multi-channel audio to mono
fn to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Frames per rubato processing block
const RESAMPLE_CHUNK: usize = 1024;

/// Resample mono audio with rubato's FFT resampler
///
/// Input is fed in fixed blocks, the last one zero padded; the padded tail
/// is cut so the output length is `len * to / from`, rounded.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> std::result::Result<Vec<f32>, String> {
    if from_rate == 0 || to_rate == 0 {
        return Err(format!("invalid sample rate conversion {}Hz to {}Hz", from_rate, to_rate));
    }
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 1)
        .map_err(|e| format!("cannot resample {}Hz to {}Hz: {}", from_rate, to_rate, e))?;

    let target_len = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;
    let block_len = resampler.input_frames_next();
    let mut block = vec![0.0f32; block_len];
    let mut output = Vec::with_capacity(target_len + resampler.output_frames_next());

    for chunk in samples.chunks(block_len) {
        block[..chunk.len()].copy_from_slice(chunk);
        block[chunk.len()..].fill(0.0);

        let resampled = resampler
            .process(&[&block], None)
            .map_err(|e| format!("resampling failed: {}", e))?;
        if let Some(channel) = resampled.first() {
            output.extend_from_slice(channel);
        }
    }

    output.truncate(target_len);
    trace!("Resampled {} -> {} samples", samples.len(), output.len());
    Ok(output)
}
