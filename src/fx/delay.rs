use super::{EffectPlugin, ParamRange, PortIo, BUILTIN_LIB};
use crate::error::PluginError;

pub const LABEL: &str = "delay";

const MAX_TIME_MS: f32 = 1000.0;

const PARAMS: [(&str, ParamRange); 3] = [
    ("Time (ms)", ParamRange::linear(10.0, MAX_TIME_MS, 250.0)),
    ("Feedback", ParamRange::linear(0.0, 0.9, 0.35)),
    ("Mix", ParamRange::linear(0.0, 1.0, 1.0)),
];

/// Ring buffer delay line with feedback and mix
pub struct Delay {
    buffer: Vec<f32>,
    write_pos: usize,
    sample_rate: f32,
    feedback: f32,
    mix: f32,
    // Smoothed read position to avoid clicks
    current_delay_samples: f32,
    target_delay_samples: f32,
}

impl Delay {
    pub fn new(sample_rate: f32) -> Self {
        let max_samples = (sample_rate * MAX_TIME_MS / 1000.0) as usize + 2;
        let initial = sample_rate * PARAMS[0].1.default / 1000.0;
        Self {
            buffer: vec![0.0; max_samples],
            write_pos: 0,
            sample_rate,
            feedback: PARAMS[1].1.default,
            mix: PARAMS[2].1.default,
            current_delay_samples: initial,
            target_delay_samples: initial,
        }
    }

    pub fn set_time(&mut self, ms: f32) {
        let ms = PARAMS[0].1.clamp(ms);
        self.target_delay_samples = self.sample_rate * ms / 1000.0;
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = PARAMS[1].1.clamp(feedback);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = PARAMS[2].1.clamp(mix);
    }

    pub fn process(&mut self, input: f32) -> f32 {
        self.current_delay_samples +=
            (self.target_delay_samples - self.current_delay_samples) * 0.001;

        // Linear interpolation between the two taps around the read position
        let buf_len = self.buffer.len() as f32;
        let mut read_pos = self.write_pos as f32 - self.current_delay_samples;
        if read_pos < 0.0 {
            read_pos += buf_len;
        }
        let read_idx = read_pos as usize;
        let frac = read_pos - read_idx as f32;
        let idx0 = read_idx % self.buffer.len();
        let idx1 = (read_idx + 1) % self.buffer.len();
        let delayed = self.buffer[idx0] * (1.0 - frac) + self.buffer[idx1] * frac;

        self.buffer[self.write_pos] = input + delayed * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        input * (1.0 - self.mix) + delayed * self.mix
    }
}

/// Mono send delay: one input, one output
pub struct DelayPlugin {
    values: [f32; 3],
    line: Option<Delay>,
}

impl DelayPlugin {
    pub fn new() -> Self {
        Self {
            values: PARAMS.map(|(_, range)| range.default),
            line: None,
        }
    }

    fn apply(&mut self) {
        if let Some(line) = self.line.as_mut() {
            line.set_time(self.values[0]);
            line.set_feedback(self.values[1]);
            line.set_mix(self.values[2]);
        }
    }
}

impl Default for DelayPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectPlugin for DelayPlugin {
    fn lib(&self) -> &str {
        BUILTIN_LIB
    }

    fn label(&self) -> &str {
        LABEL
    }

    fn input_ports(&self) -> usize {
        1
    }

    fn output_ports(&self) -> usize {
        1
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn instantiate(&mut self, sample_rate: u32) -> Result<(), PluginError> {
        if sample_rate == 0 {
            return Err(PluginError::Instantiate(format!(
                "{}: sample rate must be non-zero",
                LABEL
            )));
        }
        self.line = Some(Delay::new(sample_rate as f32));
        self.apply();
        Ok(())
    }

    fn process(&mut self, mut io: PortIo<'_>, len: usize) {
        let Some(line) = self.line.as_mut() else {
            return;
        };
        for frame in 0..len {
            let out = line.process(io.input(0, frame));
            io.write(0, frame, out);
        }
    }

    fn param(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    fn set_param(&mut self, index: usize, value: f32) {
        if let Some((_, range)) = PARAMS.get(index) {
            self.values[index] = range.clamp(value);
            self.apply();
        }
    }

    fn param_range(&self, index: usize) -> ParamRange {
        PARAMS
            .get(index)
            .map(|(_, range)| *range)
            .unwrap_or(ParamRange::linear(0.0, 1.0, 0.0))
    }

    fn param_name(&self, index: usize) -> &str {
        PARAMS.get(index).map(|(name, _)| *name).unwrap_or("")
    }
}
