use super::{EffectPlugin, ParamRange, PortIo, BUILTIN_LIB};
use crate::error::PluginError;

pub const LABEL: &str = "filter";

const PARAMS: [(&str, ParamRange); 3] = [
    ("Cutoff (Hz)", ParamRange::logarithmic(20.0, 20000.0, 2000.0)),
    ("Resonance", ParamRange::linear(0.0, 0.95, 0.2)),
    ("Type", ParamRange::integer(0.0, 2.0, 0.0)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
}

impl FilterType {
    pub fn from_index(i: usize) -> Self {
        match i % 3 {
            0 => FilterType::LowPass,
            1 => FilterType::HighPass,
            _ => FilterType::BandPass,
        }
    }

    pub fn index(self) -> usize {
        match self {
            FilterType::LowPass => 0,
            FilterType::HighPass => 1,
            FilterType::BandPass => 2,
        }
    }
}

/// State variable filter (2-pole, trapezoidal)
pub struct SvfFilter {
    sample_rate: f32,
    filter_type: FilterType,
    cutoff: f32,
    resonance: f32,
    low: f32,
    band: f32,
    g: f32,
    k: f32,
}

impl SvfFilter {
    pub fn new(sample_rate: f32) -> Self {
        let mut f = Self {
            sample_rate,
            filter_type: FilterType::LowPass,
            cutoff: PARAMS[0].1.default,
            resonance: PARAMS[1].1.default,
            low: 0.0,
            band: 0.0,
            g: 0.0,
            k: 0.0,
        };
        f.update_coefficients();
        f
    }

    fn update_coefficients(&mut self) {
        let freq = self.cutoff.clamp(20.0, self.sample_rate * 0.49);
        self.g = (std::f32::consts::PI * freq / self.sample_rate).tan();
        // resonance 0..0.95 -> k 2..0.1
        self.k = 2.0 - 2.0 * self.resonance;
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        self.cutoff = hz.clamp(20.0, 20000.0);
        self.update_coefficients();
    }

    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.clamp(0.0, 0.95);
        self.update_coefficients();
    }

    pub fn set_filter_type(&mut self, ft: FilterType) {
        self.filter_type = ft;
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
        let a2 = self.g * a1;
        let a3 = self.g * a2;

        let v3 = input - self.low - self.k * self.band;
        let v1 = a1 * self.band + a2 * v3;
        let v2 = self.low + a2 * self.band + a3 * v3;

        self.band = 2.0 * v1 - self.band;
        self.low = 2.0 * v2 - self.low;

        match self.filter_type {
            FilterType::LowPass => v2,
            FilterType::HighPass => input - self.k * v1 - v2,
            FilterType::BandPass => v1,
        }
    }
}

/// Stereo send filter: two inputs, two outputs, one SVF per side
pub struct FilterPlugin {
    values: [f32; 3],
    sides: Option<[SvfFilter; 2]>,
}

impl FilterPlugin {
    pub fn new() -> Self {
        Self {
            values: PARAMS.map(|(_, range)| range.default),
            sides: None,
        }
    }

    fn apply(&mut self) {
        let filter_type = FilterType::from_index(self.values[2] as usize);
        if let Some(sides) = self.sides.as_mut() {
            for svf in sides.iter_mut() {
                svf.set_cutoff(self.values[0]);
                svf.set_resonance(self.values[1]);
                svf.set_filter_type(filter_type);
            }
        }
    }
}

impl Default for FilterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectPlugin for FilterPlugin {
    fn lib(&self) -> &str {
        BUILTIN_LIB
    }

    fn label(&self) -> &str {
        LABEL
    }

    fn input_ports(&self) -> usize {
        2
    }

    fn output_ports(&self) -> usize {
        2
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
        let sr = sample_rate as f32;
        self.sides = Some([SvfFilter::new(sr), SvfFilter::new(sr)]);
        self.apply();
        Ok(())
    }

    fn process(&mut self, mut io: PortIo<'_>, len: usize) {
        let Some([left, right]) = self.sides.as_mut() else {
            return;
        };
        for frame in 0..len {
            let l = left.process(io.input(0, frame));
            let r = right.process(io.input(1, frame));
            io.write(0, frame, l);
            io.write(1, frame, r);
        }
    }

    fn param(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    fn set_param(&mut self, index: usize, value: f32) {
        if let Some((_, range)) = PARAMS.get(index) {
            let value = range.clamp(value);
            self.values[index] = if index == 2 { value.round() } else { value };
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

#[cfg(test)]
mod tests {
    use super::*;

    fn run_dc(plugin: &mut FilterPlugin, frames: usize) -> f32 {
        let input = vec![1.0f32; frames];
        let mut out_l = vec![0.0f32; frames];
        let mut out_r = vec![0.0f32; frames];
        plugin.process(
            PortIo {
                inputs: [Some(&input[..]), Some(&input[..])],
                outputs: [Some(&mut out_l[..]), Some(&mut out_r[..])],
            },
            frames,
        );
        assert_eq!(out_l, out_r);
        out_l[frames - 1]
    }

    #[test]
    fn lowpass_passes_dc_and_highpass_blocks_it() {
        let mut plugin = FilterPlugin::new();
        plugin.instantiate(44100).unwrap();
        assert!((run_dc(&mut plugin, 4096) - 1.0).abs() < 1e-2);

        let mut plugin = FilterPlugin::new();
        plugin.instantiate(44100).unwrap();
        plugin.set_param(2, 1.0);
        assert!(run_dc(&mut plugin, 4096).abs() < 1e-2);
    }

    #[test]
    fn type_parameter_snaps_to_integers() {
        let mut plugin = FilterPlugin::new();
        plugin.set_param(2, 1.4);
        assert_eq!(plugin.param(2), 1.0);
        assert_eq!(plugin.gui_control_value(2), 64);
    }
}
