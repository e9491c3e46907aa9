use super::{EffectPlugin, ParamRange, PortIo, BUILTIN_LIB};
use crate::error::PluginError;

pub const LABEL: &str = "distortion";

const PARAMS: [(&str, ParamRange); 2] = [
    ("Drive", ParamRange::linear(0.0, 1.0, 0.3)),
    ("Mix", ParamRange::linear(0.0, 1.0, 1.0)),
];

/// Tanh soft-clip distortion with dry/wet mix
#[derive(Debug, Clone, Copy)]
pub struct Distortion {
    drive: f32,
    mix: f32,
}

impl Distortion {
    pub fn new() -> Self {
        Self {
            drive: PARAMS[0].1.default,
            mix: PARAMS[1].1.default,
        }
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.clamp(0.0, 1.0);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn process(&self, input: f32) -> f32 {
        let gain = 1.0 + self.drive * 10.0;
        let norm = gain.tanh();
        let wet = (input * gain).tanh() / norm;
        input * (1.0 - self.mix) + wet * self.mix
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new()
    }
}

/// Mono send distortion: one input, one output
#[derive(Default)]
pub struct DistortionPlugin {
    shaper: Distortion,
}

impl DistortionPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EffectPlugin for DistortionPlugin {
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

    fn instantiate(&mut self, _sample_rate: u32) -> Result<(), PluginError> {
        Ok(())
    }

    fn process(&mut self, mut io: PortIo<'_>, len: usize) {
        for frame in 0..len {
            let out = self.shaper.process(io.input(0, frame));
            io.write(0, frame, out);
        }
    }

    fn param(&self, index: usize) -> f32 {
        match index {
            0 => self.shaper.drive,
            1 => self.shaper.mix,
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.shaper.set_drive(value),
            1 => self.shaper.set_mix(value),
            _ => {}
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
