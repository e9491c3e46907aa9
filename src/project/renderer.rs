use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::synth::{KitSynth, CHANNEL_COUNT, LOWEST_NOTE};

/// Extra time rendered after the last hit so samples can ring out
pub const TAIL_SECONDS: f32 = 1.0;

/// One note-on at an absolute frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub frame: usize,
    pub channel: usize,
    pub velocity: u8,
}

impl FromStr for Hit {
    type Err = anyhow::Error;

    /// `channel:frame` or `channel:frame:velocity`
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let channel: usize = parts
            .next()
            .unwrap_or_default()
            .trim()
            .parse()
            .with_context(|| format!("Bad channel in hit '{}'", s))?;
        let frame: usize = parts
            .next()
            .with_context(|| format!("Missing frame in hit '{}'", s))?
            .trim()
            .parse()
            .with_context(|| format!("Bad frame in hit '{}'", s))?;
        let velocity: u8 = match parts.next() {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("Bad velocity in hit '{}'", s))?,
            None => 127,
        };
        if parts.next().is_some() {
            bail!("Too many fields in hit '{}'", s);
        }
        if channel >= CHANNEL_COUNT {
            bail!("Channel {} out of range (0..{})", channel, CHANNEL_COUNT);
        }
        Ok(Self {
            frame,
            channel,
            velocity,
        })
    }
}

/// Result of an export operation
pub struct ExportResult {
    pub duration_secs: f32,
    pub frames: usize,
}

/// Render `frames` frames, triggering each hit on its exact frame.
/// Hits past the end are dropped.
pub fn render_hits(synth: &mut KitSynth, hits: &[Hit], frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut hits: Vec<Hit> = hits.iter().copied().filter(|h| h.frame < frames).collect();
    hits.sort_by_key(|h| h.frame);

    let mut left = vec![0.0f32; frames];
    let mut right = vec![0.0f32; frames];
    let mut pos = 0;
    let mut next = hits.iter().peekable();

    while pos < frames {
        while let Some(hit) = next.next_if(|h| h.frame <= pos) {
            synth.play_note(LOWEST_NOTE + hit.channel as u8, hit.velocity);
        }
        let until = next.peek().map_or(frames, |h| h.frame);
        synth.process_messages();
        synth.process(&mut left, &mut right, pos, until - pos);
        pos = until;
    }

    (left, right)
}

/// Length that covers every hit plus the ring-out tail
pub fn default_length(hits: &[Hit], sample_rate: u32) -> usize {
    let last = hits.iter().map(|h| h.frame).max().unwrap_or(0);
    last + (sample_rate as f32 * TAIL_SECONDS) as usize
}

/// Render and export audio as a 16-bit stereo WAV file
pub fn export_wav(synth: &mut KitSynth, hits: &[Hit], frames: usize, path: &Path) -> Result<ExportResult> {
    synth.wait_for_loads();
    let (left, right) = render_hits(synth, hits, frames);
    let sample_rate = synth.sample_rate();

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for (l, r) in left.iter().zip(&right) {
        writer.write_sample(to_i16(*l))?;
        writer.write_sample(to_i16(*r))?;
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize WAV file: {}", path.display()))?;

    Ok(ExportResult {
        duration_secs: frames as f32 / sample_rate as f32,
        frames,
    })
}

fn to_i16(x: f32) -> i16 {
    (x * 32767.0).clamp(-32768.0, 32767.0) as i16
}
