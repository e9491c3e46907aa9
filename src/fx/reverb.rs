use super::{EffectPlugin, ParamRange, PortIo, BUILTIN_LIB};
use crate::error::PluginError;

pub const LABEL: &str = "reverb";

const PARAMS: [(&str, ParamRange); 3] = [
    ("Decay", ParamRange::linear(0.1, 0.95, 0.6)),
    ("Damping", ParamRange::linear(0.0, 1.0, 0.5)),
    ("Mix", ParamRange::linear(0.0, 1.0, 1.0)),
];

// Comb and allpass delay times in seconds; the right side is offset for width
const COMB_TIMES_L: [f32; 4] = [0.0297, 0.0341, 0.0393, 0.0442];
const COMB_TIMES_R: [f32; 4] = [0.0307, 0.0353, 0.0401, 0.0457];
const ALLPASS_TIMES_L: [f32; 2] = [0.005, 0.0017];
const ALLPASS_TIMES_R: [f32; 2] = [0.0053, 0.0019];

/// Schroeder reverb: 4 parallel combs into 2 series allpasses per side
pub struct StereoReverb {
    comb_l: [CombFilter; 4],
    allpass_l: [AllpassFilter; 2],
    comb_r: [CombFilter; 4],
    allpass_r: [AllpassFilter; 2],
    decay: f32,
    damping: f32,
    mix: f32,
}

impl StereoReverb {
    pub fn new(sample_rate: f32) -> Self {
        let decay = PARAMS[0].1.default;
        let damping = PARAMS[1].1.default;
        let comb = |t: f32| CombFilter::new((sample_rate * t) as usize, decay, damping);
        let allpass = |t: f32| AllpassFilter::new((sample_rate * t) as usize);

        Self {
            comb_l: COMB_TIMES_L.map(comb),
            allpass_l: ALLPASS_TIMES_L.map(allpass),
            comb_r: COMB_TIMES_R.map(comb),
            allpass_r: ALLPASS_TIMES_R.map(allpass),
            decay,
            damping,
            mix: PARAMS[2].1.default,
        }
    }

    pub fn set_decay(&mut self, decay: f32) {
        self.decay = decay.clamp(0.1, 0.95);
        for c in self.comb_l.iter_mut().chain(self.comb_r.iter_mut()) {
            c.feedback = self.decay;
        }
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping.clamp(0.0, 1.0);
        for c in self.comb_l.iter_mut().chain(self.comb_r.iter_mut()) {
            c.damping = self.damping;
        }
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut wet_l = self.comb_l.iter_mut().map(|c| c.process(left)).sum::<f32>() * 0.25;
        let mut wet_r = self.comb_r.iter_mut().map(|c| c.process(right)).sum::<f32>() * 0.25;

        for ap in &mut self.allpass_l {
            wet_l = ap.process(wet_l);
        }
        for ap in &mut self.allpass_r {
            wet_r = ap.process(wet_r);
        }

        (
            left * (1.0 - self.mix) + wet_l * self.mix,
            right * (1.0 - self.mix) + wet_r * self.mix,
        )
    }
}

/// Comb filter with a one-pole lowpass in the feedback path
struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
    damp_state: f32,
    damping: f32,
}

impl CombFilter {
    fn new(delay: usize, feedback: f32, damping: f32) -> Self {
        Self {
            buffer: vec![0.0; delay.max(1)],
            pos: 0,
            feedback,
            damp_state: 0.0,
            damping,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        self.damp_state = delayed * (1.0 - self.damping) + self.damp_state * self.damping;
        self.buffer[self.pos] = input + self.damp_state * self.feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        delayed
    }
}

struct AllpassFilter {
    buffer: Vec<f32>,
    pos: usize,
}

impl AllpassFilter {
    fn new(delay: usize) -> Self {
        Self {
            buffer: vec![0.0; delay.max(1)],
            pos: 0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        self.buffer[self.pos] = input + delayed * 0.5;
        self.pos = (self.pos + 1) % self.buffer.len();
        delayed - input
    }
}

/// Stereo send reverb: two inputs, two outputs
pub struct ReverbPlugin {
    values: [f32; 3],
    reverb: Option<StereoReverb>,
}

impl ReverbPlugin {
    pub fn new() -> Self {
        Self {
            values: PARAMS.map(|(_, range)| range.default),
            reverb: None,
        }
    }

    fn apply(&mut self) {
        if let Some(reverb) = self.reverb.as_mut() {
            reverb.set_decay(self.values[0]);
            reverb.set_damping(self.values[1]);
            reverb.set_mix(self.values[2]);
        }
    }
}

impl Default for ReverbPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectPlugin for ReverbPlugin {
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
        self.reverb = Some(StereoReverb::new(sample_rate as f32));
        self.apply();
        Ok(())
    }

    fn process(&mut self, mut io: PortIo<'_>, len: usize) {
        let Some(reverb) = self.reverb.as_mut() else {
            return;
        };
        for frame in 0..len {
            let (l, r) = reverb.process_stereo(io.input(0, frame), io.input(1, frame));
            io.write(0, frame, l);
            io.write(1, frame, r);
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
