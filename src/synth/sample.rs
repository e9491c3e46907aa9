use std::path::Path;

use hound::SampleFormat;
use log::{debug, info};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::LoadError;

/// Decoded PCM owned by exactly one channel
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    data: Vec<f32>,
    channels: usize,
    frames: usize,
    samples: usize,
    filename: String,
}

impl Sample {
    /// Wrap interleaved PCM. `channels` must be 1 or 2.
    pub fn from_interleaved(data: Vec<f32>, channels: usize, filename: impl Into<String>) -> Self {
        let channels = channels.clamp(1, 2);
        let samples = data.len() - data.len() % channels;
        Self {
            frames: samples / channels,
            samples,
            data,
            channels,
            filename: filename.into(),
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Length of the playable region in individual values
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Decode a WAV file, resampling to `target_rate` when the file differs
    pub fn decode(path: &Path, filename: &str, target_rate: u32) -> Result<Self, LoadError> {
        let reader = hound::WavReader::open(path).map_err(|source| LoadError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if !(1..=2).contains(&channels) {
            return Err(LoadError::UnsupportedChannels {
                path: path.display().to_string(),
                channels: spec.channels,
            });
        }

        let read_err = |source: hound::Error| LoadError::Read {
            path: path.display().to_string(),
            source,
        };
        let data: Vec<f32> = match spec.sample_format {
            SampleFormat::Int => {
                let max_val = (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<Result<_, _>>()
                    .map_err(read_err)?
            }
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(read_err)?,
        };

        if data.len() < channels {
            return Err(LoadError::Empty(path.display().to_string()));
        }

        debug!(
            "decoded {}: {} ch, {} Hz, {} frames",
            path.display(),
            channels,
            spec.sample_rate,
            data.len() / channels
        );

        if spec.sample_rate == target_rate || spec.sample_rate == 0 || target_rate == 0 {
            return Ok(Self::from_interleaved(data, channels, filename));
        }

        let resampled = resample(&data, channels, spec.sample_rate, target_rate).map_err(|reason| {
            LoadError::Resample {
                path: path.display().to_string(),
                reason,
            }
        })?;
        info!(
            "resampled {} from {} Hz to {} Hz",
            path.display(),
            spec.sample_rate,
            target_rate
        );

        if channels == 1 {
            // Mono resampled buffers are allocated at twice the frame count;
            // the tail stays silent and is still part of the playable region.
            let doubled = resampled.len() * 2;
            let mut data = resampled;
            data.resize(doubled, 0.0);
            return Ok(Self {
                data,
                channels: 1,
                frames: doubled,
                samples: doubled,
                filename: filename.to_string(),
            });
        }
        Ok(Self::from_interleaved(resampled, channels, filename))
    }
}

/// Sinc-resample interleaved PCM to exactly floor(frames * ratio) frames
pub fn resample(
    interleaved: &[f32],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, String> {
    let frames = interleaved.len() / channels;
    let ratio = target_rate as f64 / source_rate as f64;
    let out_frames = (frames as u64 * target_rate as u64 / source_rate as u64) as usize;

    let planar: Vec<Vec<f32>> = (0..channels)
        .map(|ch| interleaved.iter().skip(ch).step_by(channels).copied().collect())
        .collect();

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, channels)
        .map_err(|e| e.to_string())?;

    let mut result = resampler.process(&planar, None).map_err(|e| e.to_string())?;
    let tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|e| e.to_string())?;
    for (ch, rest) in result.iter_mut().zip(tail) {
        ch.extend_from_slice(&rest);
    }

    // Drop the filter delay so the onset stays at frame 0
    let delay = resampler.output_delay();
    for ch in result.iter_mut() {
        let start = delay.min(ch.len());
        ch.drain(..start);
        ch.resize(out_frames, 0.0);
    }

    let mut out = Vec::with_capacity(out_frames * channels);
    for frame in 0..out_frames {
        for ch in &result {
            out.push(ch[frame]);
        }
    }
    Ok(out)
}
