use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig, SupportedStreamConfig};
use log::{error, info, warn};

use crate::command::CommandSender;
use crate::synth::KitSynth;

/// Default output device and its preferred configuration
pub fn default_output() -> Result<(Device, SupportedStreamConfig)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No output device available")?;
    let config = device
        .default_output_config()
        .context("Output device has no default configuration")?;
    Ok((device, config))
}

/// Live output: owns the engine inside the device callback
pub struct AudioEngine {
    _stream: Stream,
    sender: CommandSender,
    sample_rate: u32,
}

impl AudioEngine {
    /// Move `synth` into an output stream on `device`. The engine should have
    /// been created at `config`'s sample rate.
    pub fn start(device: &Device, config: SupportedStreamConfig, synth: KitSynth) -> Result<Self> {
        let sample_rate = config.sample_rate().0;
        if synth.sample_rate() != sample_rate {
            warn!(
                "engine runs at {} Hz but the device at {} Hz",
                synth.sample_rate(),
                sample_rate
            );
        }
        let sender = synth.gui_sender();

        let stream = match config.sample_format() {
            SampleFormat::F32 => Self::build_stream::<f32>(device, &config.into(), synth)?,
            SampleFormat::I16 => Self::build_stream::<i16>(device, &config.into(), synth)?,
            SampleFormat::U16 => Self::build_stream::<u16>(device, &config.into(), synth)?,
            format => anyhow::bail!("Unsupported sample format: {:?}", format),
        };

        stream.play().context("Failed to start output stream")?;
        info!("audio running at {} Hz", sample_rate);

        Ok(Self {
            _stream: stream,
            sender,
            sample_rate,
        })
    }

    /// Queue for events applied at the start of the next callback
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn build_stream<T>(device: &Device, config: &StreamConfig, mut synth: KitSynth) -> Result<Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let mut left: Vec<f32> = Vec::new();
        let mut right: Vec<f32> = Vec::new();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                if left.len() < frames {
                    left.resize(frames, 0.0);
                    right.resize(frames, 0.0);
                }
                left[..frames].fill(0.0);
                right[..frames].fill(0.0);

                synth.process_messages();
                synth.process(&mut left, &mut right, 0, frames);

                // Left to ch0, right to ch1, mono fallback for others
                for (i, frame) in data.chunks_mut(channels).enumerate() {
                    let (l, r) = (left[i], right[i]);
                    for (ch, out) in frame.iter_mut().enumerate() {
                        let value = match ch {
                            0 => l,
                            1 => r,
                            _ => (l + r) * 0.5,
                        };
                        *out = T::from_sample(value);
                    }
                }
            },
            |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }
}
